use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the survivor pool backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::game::list_games,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::join_game,
        crate::routes::game::start_game,
        crate::routes::game::cancel_game,
        crate::routes::game::standings,
        crate::routes::game::submit_pick,
        crate::routes::game::player_picks,
        crate::routes::game::player_teams,
        crate::routes::game::process_week,
        crate::routes::results::ingest_matchups,
        crate::routes::results::list_matchups,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::GameView,
            crate::dto::game::ParticipantView,
            crate::dto::game::StandingView,
            crate::dto::game::StandingsView,
            crate::dto::pick::SubmitPickRequest,
            crate::dto::pick::PickView,
            crate::dto::pick::TeamUsageView,
            crate::dto::results::MatchupInput,
            crate::dto::results::MatchupBatch,
            crate::dto::results::MatchupView,
            crate::dto::results::IngestResponse,
            crate::dto::results::InvariantView,
            crate::dto::results::WeekReportView,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ParticipantEliminatedEvent,
            crate::dto::sse::GameCompletedEvent,
            crate::dao::models::GameStatus,
            crate::dao::models::ParticipantStatus,
            crate::dao::models::EliminationReason,
            crate::dao::models::TiePolicy,
        )
    ),
    tags(
        (name = "health", description = "Store availability"),
        (name = "games", description = "Game lifecycle and standings"),
        (name = "picks", description = "Weekly pick submission and team usage"),
        (name = "results", description = "Matchup ingest and weekly processing"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
