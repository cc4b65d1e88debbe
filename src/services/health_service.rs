use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the installed store, if any, and combine the result with the degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.store().await else {
        warn!("healthcheck without a store (degraded mode)");
        return HealthResponse {
            status: HealthStatus::Degraded,
            store_installed: false,
        };
    };

    let probe_ok = match store.health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "store probe failed");
            false
        }
    };
    let status = if probe_ok && !state.is_degraded().await {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };
    HealthResponse {
        status,
        store_installed: true,
    }
}
