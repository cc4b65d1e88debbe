use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{CreateGameRequest, GameView, JoinGameRequest, ParticipantView, StandingsView},
        pick::{PickView, SubmitPickRequest, TeamUsageView},
        results::WeekReportView,
    },
    error::AppError,
    state::SharedState,
};

/// Game lifecycle, pick and processing endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/cancel", post(cancel_game))
        .route("/games/{id}/standings", get(standings))
        .route("/games/{id}/picks", post(submit_pick))
        .route("/games/{id}/players/{player_id}/picks", get(player_picks))
        .route("/games/{id}/players/{player_id}/teams", get(player_teams))
        .route("/games/{id}/weeks/{week}/process", post(process_week))
}

/// List every game known to the store.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Known games", body = [GameView]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Result<Json<Vec<GameView>>, AppError> {
    let games = state.core().await?.list_games().await?;
    Ok(Json(games.into_iter().map(GameView::from).collect()))
}

/// Open a new survivor pool.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameView),
        (status = 422, description = "Inconsistent week bounds or capacity")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameView>, AppError> {
    let game = state.core().await?.create_game(payload.into()).await?;
    Ok(Json(game.into()))
}

/// Retrieve a game by its identifier.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Game", body = GameView), (status = 404, description = "Unknown game"))
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(state.core().await?.get_game(id).await?.into()))
}

/// Take a seat in an open game.
#[utoipa::path(
    post,
    path = "/games/{id}/join",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Participant admitted", body = ParticipantView),
        (status = 409, description = "Game not open, full, or player already joined")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<ParticipantView>, AppError> {
    let participant = state
        .core()
        .await?
        .join_game(id, payload.player_id.trim())
        .await?;
    Ok(Json(participant.into()))
}

/// Close joins and start the game.
#[utoipa::path(
    post,
    path = "/games/{id}/start",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Game active", body = GameView))
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(state.core().await?.start_game(id).await?.into()))
}

/// Abandon a game that has not started.
#[utoipa::path(
    post,
    path = "/games/{id}/cancel",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Game cancelled", body = GameView))
)]
pub async fn cancel_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(state.core().await?.cancel_game(id).await?.into()))
}

/// Leaderboard of a game.
#[utoipa::path(
    get,
    path = "/games/{id}/standings",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Ordered standings", body = StandingsView))
)]
pub async fn standings(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StandingsView>, AppError> {
    let (game, entries) = state.core().await?.standings(id).await?;
    Ok(Json(StandingsView {
        game: game.into(),
        standings: entries.into_iter().map(Into::into).collect(),
    }))
}

/// Submit or replace a pick for one slot of a week.
#[utoipa::path(
    post,
    path = "/games/{id}/picks",
    tag = "picks",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SubmitPickRequest,
    responses(
        (status = 200, description = "Pick stored", body = PickView),
        (status = 409, description = "Pick rejected by a game rule"),
        (status = 422, description = "Week or slot outside the game's bounds")
    )
)]
pub async fn submit_pick(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitPickRequest>>,
) -> Result<Json<PickView>, AppError> {
    let pick = state
        .core()
        .await?
        .submit_pick(payload.into_submission(id))
        .await?;
    Ok(Json(pick.into()))
}

/// Every pick made by a player in a game.
#[utoipa::path(
    get,
    path = "/games/{id}/players/{player_id}/picks",
    tag = "picks",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    responses((status = 200, description = "Picks by week and slot", body = [PickView]))
)]
pub async fn player_picks(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, String)>,
) -> Result<Json<Vec<PickView>>, AppError> {
    let picks = state.core().await?.picks_for_player(id, &player_id).await?;
    Ok(Json(picks.into_iter().map(PickView::from).collect()))
}

/// Teams a player has already spent.
#[utoipa::path(
    get,
    path = "/games/{id}/players/{player_id}/teams",
    tag = "picks",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("player_id" = String, Path, description = "Identifier of the player")
    ),
    responses((status = 200, description = "Used teams", body = [TeamUsageView]))
)]
pub async fn player_teams(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, String)>,
) -> Result<Json<Vec<TeamUsageView>>, AppError> {
    let usage = state.core().await?.team_usage(id, &player_id).await?;
    Ok(Json(usage.into_iter().map(TeamUsageView::from).collect()))
}

/// Resolve picks and apply eliminations for one week.
#[utoipa::path(
    post,
    path = "/games/{id}/weeks/{week}/process",
    tag = "results",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("week" = u32, Path, description = "Week to process")
    ),
    responses((status = 200, description = "Processing report", body = WeekReportView))
)]
pub async fn process_week(
    State(state): State<SharedState>,
    Path((id, week)): Path<(Uuid, u32)>,
) -> Result<Json<WeekReportView>, AppError> {
    let report = state.core().await?.process_week(id, week).await?;
    Ok(Json(report.into()))
}
