use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{EliminationReason, ParticipantEntity, ParticipantStatus},
        survivor_store::SurvivorStore,
    },
    error::ServiceError,
    services::{
        lifecycle::{Finalization, GameLifecycle},
        notifications::{Notification, NotificationSink},
        retry::RetryPolicy,
    },
    state::clock::Clock,
};

/// What happened to a single elimination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminationOutcome {
    /// Written by this call.
    Applied(ParticipantEntity),
    /// The participant was already out; the stored record is untouched.
    AlreadyEliminated(ParticipantEntity),
    /// The game is completed or cancelled.
    GameClosed,
}

/// One participant to knock out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingElimination {
    /// Participant to knock out.
    pub participant_id: Uuid,
    /// Recorded reason.
    pub reason: EliminationReason,
}

/// Result of [`EliminationTracker::eliminate_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Participants eliminated by this batch.
    pub eliminated: Vec<Uuid>,
    /// Participants whose elimination could not be written.
    pub failed: Vec<Uuid>,
    /// Present when the batch was non-empty.
    pub finalization: Option<Finalization>,
}

/// Owns the `active → eliminated` transition.
#[derive(Clone)]
pub struct EliminationTracker {
    store: Arc<dyn SurvivorStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    lifecycle: GameLifecycle,
}

impl EliminationTracker {
    /// Tracker writing through `store` and alerting through `notifier`.
    pub fn new(
        store: Arc<dyn SurvivorStore>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        lifecycle: GameLifecycle,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            retry,
            lifecycle,
        }
    }

    /// Eliminate one participant in `week`, retrying lost races.
    pub async fn eliminate(
        &self,
        participant_id: Uuid,
        week: u32,
        reason: EliminationReason,
    ) -> Result<EliminationOutcome, ServiceError> {
        self.retry
            .run("eliminate_participant", || {
                self.try_eliminate(participant_id, week, reason)
            })
            .await
    }

    async fn try_eliminate(
        &self,
        participant_id: Uuid,
        week: u32,
        reason: EliminationReason,
    ) -> Result<EliminationOutcome, ServiceError> {
        let mut participant = self
            .store
            .find_participant(participant_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("participant `{participant_id}`")))?;
        if !participant.is_active() {
            return Ok(EliminationOutcome::AlreadyEliminated(participant));
        }

        let game = self.lifecycle.load_game(participant.game_id).await?;
        if game.status.is_terminal() {
            return Ok(EliminationOutcome::GameClosed);
        }

        participant.status = ParticipantStatus::Eliminated;
        participant.eliminated_week = Some(week);
        participant.elimination_reason = Some(reason);
        participant.eliminated_at = Some(self.clock.now());
        let stored = self.store.update_participant(participant).await?;
        Ok(EliminationOutcome::Applied(stored))
    }

    /// Eliminate every entry of `batch`, then try to complete the game once.
    ///
    /// `awaiting` is handed to [`GameLifecycle::finalize_if_complete`].
    pub async fn eliminate_batch(
        &self,
        game_id: Uuid,
        week: u32,
        batch: &[PendingElimination],
        awaiting: &[Uuid],
    ) -> Result<BatchOutcome, ServiceError> {
        let mut outcome = BatchOutcome::default();
        if batch.is_empty() {
            return Ok(outcome);
        }

        for entry in batch {
            match self.eliminate(entry.participant_id, week, entry.reason).await {
                Ok(EliminationOutcome::Applied(participant)) => {
                    info!(
                        %game_id,
                        participant_id = %participant.id,
                        player_id = %participant.player_id,
                        week,
                        reason = ?entry.reason,
                        "participant eliminated"
                    );
                    self.notifier.notify(Notification::ParticipantEliminated {
                        game_id,
                        participant_id: participant.id,
                        player_id: participant.player_id,
                        week,
                        reason: entry.reason,
                    });
                    outcome.eliminated.push(entry.participant_id);
                }
                Ok(EliminationOutcome::AlreadyEliminated(_)) => {
                    debug!(participant_id = %entry.participant_id, "participant already eliminated");
                }
                Ok(EliminationOutcome::GameClosed) => {
                    debug!(%game_id, participant_id = %entry.participant_id, "game closed; elimination skipped");
                }
                Err(err) => {
                    warn!(
                        %game_id,
                        participant_id = %entry.participant_id,
                        error = %err,
                        "failed to eliminate participant"
                    );
                    outcome.failed.push(entry.participant_id);
                }
            }
        }

        outcome.finalization = Some(self.lifecycle.finalize_if_complete(game_id, awaiting).await?);
        Ok(outcome)
    }
}
