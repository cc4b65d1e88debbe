use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Business rules a caller can break. Surfaced verbatim and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// Join, start or cancel on a game that left `open`.
    #[error("game is not open for this operation")]
    GameNotOpen,
    /// Every seat is taken.
    #[error("game has reached its capacity")]
    GameFull,
    /// The player already holds a seat.
    #[error("player already joined this game")]
    AlreadyJoined,
    /// The player has no seat, or was eliminated.
    #[error("player is not an active participant of this game")]
    NotActiveParticipant,
    /// The matchup kicked off, finished or is unknown for the week.
    #[error("matchup is locked")]
    MatchupLocked,
    /// The team does not play in the named matchup.
    #[error("team does not play in this matchup")]
    TeamNotInMatchup,
    /// The participant spent this team in another week or slot.
    #[error("team was already used by this participant")]
    TeamAlreadyUsed,
    /// Slot 2 before the two-pick week, or any slot past 2.
    #[error("slot is not valid for this week")]
    InvalidSlotForWeek,
    /// Game settings are inconsistent.
    #[error("invalid game configuration")]
    InvalidConfiguration,
    /// Picks or processing on a game that is not running.
    #[error("game is not active")]
    GameNotActive,
    /// Week outside `start_week..=end_week`.
    #[error("week is outside the game's bounds")]
    WeekOutOfRange,
    /// The matchup belongs to another season or week.
    #[error("matchup does not belong to this season and week")]
    MatchupWeekMismatch,
    /// Start requested on an empty game.
    #[error("game has no participants")]
    NoParticipants,
}

impl RuleViolation {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            RuleViolation::GameNotOpen => "GAME_NOT_OPEN",
            RuleViolation::GameFull => "GAME_FULL",
            RuleViolation::AlreadyJoined => "ALREADY_JOINED",
            RuleViolation::NotActiveParticipant => "NOT_ACTIVE_PARTICIPANT",
            RuleViolation::MatchupLocked => "MATCHUP_LOCKED",
            RuleViolation::TeamNotInMatchup => "TEAM_NOT_IN_MATCHUP",
            RuleViolation::TeamAlreadyUsed => "TEAM_ALREADY_USED",
            RuleViolation::InvalidSlotForWeek => "INVALID_SLOT_FOR_WEEK",
            RuleViolation::InvalidConfiguration => "INVALID_CONFIGURATION",
            RuleViolation::GameNotActive => "GAME_NOT_ACTIVE",
            RuleViolation::WeekOutOfRange => "WEEK_OUT_OF_RANGE",
            RuleViolation::MatchupWeekMismatch => "MATCHUP_WEEK_MISMATCH",
            RuleViolation::NoParticipants => "NO_PARTICIPANTS",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            RuleViolation::InvalidConfiguration
            | RuleViolation::WeekOutOfRange
            | RuleViolation::InvalidSlotForWeek => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::CONFLICT,
        }
    }
}

/// Persisted data contradicts an invariant the processor relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("invariant violated for participant {participant_id} in week {week}: {detail}")]
pub struct InvariantViolation {
    /// Participant whose records are inconsistent.
    pub participant_id: Uuid,
    /// Week being processed.
    pub week: u32,
    /// What was found.
    pub detail: String,
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Concurrent writers kept winning until the retry budget ran out.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Stored data is inconsistent.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } | StorageError::Duplicate { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// A business rule rejected the request.
    #[error("{0}")]
    Rule(RuleViolation),
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rule(rule) => AppError::Rule(rule),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::Invariant(violation) => AppError::Internal(violation.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Rule(rule) => (rule.status(), rule.code()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();

        let payload = Json(ErrorBody {
            message: self.to_string(),
            code,
        });

        (status, payload).into_response()
    }
}
