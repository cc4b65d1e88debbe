use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::EliminationReason,
    dto::sse::{GameCompletedEvent, ParticipantEliminatedEvent, ServerEvent},
    state::SseHub,
};

/// Event name used for eliminations on the public stream.
pub const PARTICIPANT_ELIMINATED_EVENT: &str = "participant.eliminated";
/// Event name used for completed games on the public stream.
pub const GAME_COMPLETED_EVENT: &str = "game.completed";

/// Alert emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A participant was knocked out.
    ParticipantEliminated {
        /// Game the participant played in.
        game_id: Uuid,
        /// Eliminated participant.
        participant_id: Uuid,
        /// Player owning the seat.
        player_id: String,
        /// Week that knocked them out.
        week: u32,
        /// Why they were knocked out.
        reason: EliminationReason,
    },
    /// A game reached `completed`.
    GameCompleted {
        /// Completed game.
        game_id: Uuid,
        /// Sole survivor, if any.
        winner: Option<Uuid>,
        /// Participants still active at completion.
        survivors: Vec<Uuid>,
    },
}

/// Fire-and-forget delivery of elimination and win alerts.
pub trait NotificationSink: Send + Sync {
    /// Deliver one alert. Must not block.
    fn notify(&self, notification: Notification);
}

/// Publishes notifications on the public SSE hub.
pub struct SseNotificationSink {
    hub: Arc<SseHub>,
}

impl SseNotificationSink {
    /// Sink publishing on `hub`.
    pub fn new(hub: Arc<SseHub>) -> Self {
        Self { hub }
    }
}

impl NotificationSink for SseNotificationSink {
    fn notify(&self, notification: Notification) {
        let event = match notification {
            Notification::ParticipantEliminated {
                game_id,
                participant_id,
                player_id,
                week,
                reason,
            } => ServerEvent::json(
                PARTICIPANT_ELIMINATED_EVENT.to_string(),
                &ParticipantEliminatedEvent {
                    game_id,
                    participant_id,
                    player_id,
                    week,
                    reason,
                },
            ),
            Notification::GameCompleted {
                game_id,
                winner,
                survivors,
            } => ServerEvent::json(
                GAME_COMPLETED_EVENT.to_string(),
                &GameCompletedEvent {
                    game_id,
                    winner,
                    survivors,
                },
            ),
        };

        match event {
            Ok(event) => self.hub.broadcast(event),
            Err(err) => warn!(error = %err, "failed to serialise notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn eliminations_are_published_as_named_events() {
        let hub = Arc::new(SseHub::new(4));
        let mut receiver = hub.subscribe();
        let sink = SseNotificationSink::new(hub);
        let participant_id = Uuid::new_v4();

        sink.notify(Notification::ParticipantEliminated {
            game_id: Uuid::nil(),
            participant_id,
            player_id: "bob".into(),
            week: 1,
            reason: EliminationReason::TiedPick,
        });

        let event = receiver.recv().await.expect("event published");
        assert_eq!(event.event.as_deref(), Some(PARTICIPANT_ELIMINATED_EVENT));
        let payload: serde_json::Value = serde_json::from_str(&event.data).expect("json payload");
        assert_eq!(payload["reason"], "tied_pick");
        assert_eq!(payload["participant_id"], participant_id.to_string());
    }
}
