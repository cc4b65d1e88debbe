use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::EliminationReason;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name; `None` sends a plain message.
    pub event: Option<String>,
    /// Serialized JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Event carrying pre-serialized `data`.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// `true` while no usable store is installed.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a participant is knocked out.
pub struct ParticipantEliminatedEvent {
    /// Game the participant played in.
    pub game_id: Uuid,
    /// Eliminated participant.
    pub participant_id: Uuid,
    /// Player owning the seat.
    pub player_id: String,
    /// Week that knocked them out.
    pub week: u32,
    /// Why they were knocked out.
    pub reason: EliminationReason,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game reaches its final state.
pub struct GameCompletedEvent {
    /// Completed game.
    pub game_id: Uuid,
    /// Sole survivor, absent when nobody or several participants survived.
    pub winner: Option<Uuid>,
    /// Participants still active when the game completed.
    pub survivors: Vec<Uuid>,
}
