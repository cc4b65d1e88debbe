use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dao::models::MatchupEntity,
    dto::results::{IngestResponse, MatchupBatch, MatchupView},
    error::AppError,
    state::SharedState,
};

/// Manual matchup ingest and schedule lookup.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/matchups", put(ingest_matchups))
        .route("/matchups/{season}/{week}", get(list_matchups))
}

/// Store matchups and scores reported by an operator.
#[utoipa::path(
    put,
    path = "/matchups",
    tag = "results",
    request_body = MatchupBatch,
    responses(
        (status = 200, description = "Matchups stored", body = IngestResponse),
        (status = 400, description = "Malformed matchup")
    )
)]
pub async fn ingest_matchups(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MatchupBatch>>,
) -> Result<Json<IngestResponse>, AppError> {
    let matchups = payload
        .matchups
        .into_iter()
        .map(MatchupEntity::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::BadRequest)?;
    let saved = state.core().await?.save_matchups(matchups).await?;
    Ok(Json(IngestResponse { saved }))
}

/// Matchups stored for a season week.
#[utoipa::path(
    get,
    path = "/matchups/{season}/{week}",
    tag = "results",
    params(
        ("season" = u16, Path, description = "Season year"),
        ("week" = u32, Path, description = "Week number")
    ),
    responses((status = 200, description = "Stored matchups", body = [MatchupView]))
)]
pub async fn list_matchups(
    State(state): State<SharedState>,
    Path((season, week)): Path<(u16, u32)>,
) -> Result<Json<Vec<MatchupView>>, AppError> {
    let matchups = state.core().await?.list_matchups(season, week).await?;
    Ok(Json(matchups.into_iter().map(MatchupView::from).collect()))
}
