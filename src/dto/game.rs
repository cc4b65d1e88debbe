use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{EliminationReason, GameEntity, GameStatus, ParticipantEntity, ParticipantStatus, TiePolicy},
    dto::{format_system_time, validation::validate_player_id},
    services::lifecycle::{GameSettings, StandingEntry},
};

/// Payload used to open a new survivor pool.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Entry fee per seat, in cents. Free when omitted.
    #[serde(default)]
    pub entry_fee_cents: u64,
    /// Maximum number of seats.
    #[validate(range(min = 1))]
    pub capacity: u32,
    /// NFL season year.
    pub season: u16,
    /// First counted week.
    #[validate(range(min = 1))]
    pub start_week: u32,
    /// Last counted week.
    #[validate(range(min = 1))]
    pub end_week: u32,
    /// First week where every participant owes two picks.
    pub two_pick_week: u32,
    /// Falls back to the service default when omitted.
    #[serde(default)]
    pub tie_policy: Option<TiePolicy>,
}

impl From<CreateGameRequest> for GameSettings {
    fn from(request: CreateGameRequest) -> Self {
        GameSettings {
            name: request.name,
            entry_fee_cents: request.entry_fee_cents,
            capacity: request.capacity,
            season: request.season,
            start_week: request.start_week,
            end_week: request.end_week,
            two_pick_week: request.two_pick_week,
            tie_policy: request.tie_policy,
        }
    }
}

/// Request to take a seat in an open game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGameRequest {
    /// Opaque player identifier.
    pub player_id: String,
}

impl Validate for JoinGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_player_id(&self.player_id) {
            errors.add("player_id", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Public projection of a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    /// Game id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle position.
    pub status: GameStatus,
    /// Entry fee per seat, in cents.
    pub entry_fee_cents: u64,
    /// Fees collected so far, in cents.
    pub prize_pool_cents: u64,
    /// Maximum number of seats.
    pub capacity: u32,
    /// Seats taken.
    pub participant_count: u32,
    /// NFL season year.
    pub season: u16,
    /// First counted week.
    pub start_week: u32,
    /// Last counted week.
    pub end_week: u32,
    /// First week owing two picks.
    pub two_pick_week: u32,
    /// Scoring rule for tied matchups.
    pub tie_policy: TiePolicy,
    /// Participant id of the sole survivor.
    pub winner: Option<Uuid>,
    /// RFC 3339 timestamps.
    pub created_at: String,
    /// Set once the game started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Set once the game completed or was cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<GameEntity> for GameView {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            name: game.name,
            status: game.status,
            entry_fee_cents: game.entry_fee_cents,
            prize_pool_cents: game.prize_pool_cents,
            capacity: game.capacity,
            participant_count: game.participant_count,
            season: game.season,
            start_week: game.start_week,
            end_week: game.end_week,
            two_pick_week: game.two_pick_week,
            tie_policy: game.tie_policy,
            winner: game.winner,
            created_at: format_system_time(game.created_at),
            started_at: game.started_at.map(format_system_time),
            completed_at: game.completed_at.map(format_system_time),
        }
    }
}

/// Public projection of a participant seat.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantView {
    /// Participant id.
    pub id: Uuid,
    /// Opaque player identifier.
    pub player_id: String,
    /// Alive or eliminated.
    pub status: ParticipantStatus,
    /// Week that knocked the participant out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminated_week: Option<u32>,
    /// Why the participant was knocked out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elimination_reason: Option<EliminationReason>,
    /// When the seat was taken, RFC 3339.
    pub joined_at: String,
}

impl From<ParticipantEntity> for ParticipantView {
    fn from(participant: ParticipantEntity) -> Self {
        Self {
            id: participant.id,
            player_id: participant.player_id,
            status: participant.status,
            eliminated_week: participant.eliminated_week,
            elimination_reason: participant.elimination_reason,
            joined_at: format_system_time(participant.joined_at),
        }
    }
}

/// One leaderboard line.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingView {
    /// Seat this line describes.
    pub participant: ParticipantView,
    /// Picks resolved as correct.
    pub correct_picks: u32,
    /// Teams spent so far, by week.
    pub used_teams: Vec<String>,
    /// Whether this participant won the game.
    pub winner: bool,
}

impl From<StandingEntry> for StandingView {
    fn from(entry: StandingEntry) -> Self {
        Self {
            participant: entry.participant.into(),
            correct_picks: entry.correct_picks,
            used_teams: entry.used_teams,
            winner: entry.winner,
        }
    }
}

/// Game together with its ordered leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingsView {
    /// Game the leaderboard belongs to.
    pub game: GameView,
    /// Winner first, then active, then latest eliminated.
    pub standings: Vec<StandingView>,
}
