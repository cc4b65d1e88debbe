//! Body of the `/healthcheck` route.

use serde::Serialize;
use utoipa::ToSchema;

/// Whether picks and results can currently be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A store is installed and answered its probe.
    Ok,
    /// No usable store; mutating routes answer 503.
    Degraded,
}

/// Store availability as seen by the backend.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall verdict.
    pub status: HealthStatus,
    /// A store backend is installed, even if its last probe failed.
    pub store_installed: bool,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
