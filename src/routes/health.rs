use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Running without a usable store", body = HealthResponse)
    )
)]
/// Report whether the pool can serve picks and results right now.
pub async fn healthcheck(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let report = health_service::health_status(&state).await;
    let code = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/healthcheck", get(healthcheck))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::survivor_store::memory::InMemorySurvivorStore, state::AppState,
    };

    #[tokio::test]
    async fn degraded_service_answers_503() {
        let state = AppState::new(AppConfig::default());
        let (code, _) = healthcheck(State(state.clone())).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);

        state.set_store(Arc::new(InMemorySurvivorStore::new())).await;
        let (code, Json(body)) = healthcheck(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.store_installed);
    }
}
