//! Game creation, admission and the `open → active → completed` lifecycle.

use std::{cmp::Reverse, sync::Arc};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, GameStatus, ParticipantEntity, ParticipantStatus, TiePolicy},
        storage::StorageError,
        survivor_store::SurvivorStore,
    },
    error::{RuleViolation, ServiceError},
    services::{
        notifications::{Notification, NotificationSink},
        retry::RetryPolicy,
    },
    state::clock::Clock,
};

/// Parameters of a new game.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Display name.
    pub name: String,
    /// Fee per seat, in cents.
    pub entry_fee_cents: u64,
    /// Maximum number of seats.
    pub capacity: u32,
    /// NFL season year.
    pub season: u16,
    /// First counted week.
    pub start_week: u32,
    /// Last counted week.
    pub end_week: u32,
    /// First week owing two picks.
    pub two_pick_week: u32,
    /// Falls back to the service default when absent.
    pub tie_policy: Option<TiePolicy>,
}

impl GameSettings {
    fn is_consistent(&self) -> bool {
        !self.name.trim().is_empty()
            && self.capacity >= 1
            && self.start_week >= 1
            && self.start_week <= self.end_week
            && (self.start_week..=self.end_week).contains(&self.two_pick_week)
    }
}

/// Result of an attempt to complete a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    /// Not decided yet: several participants are active, or the sole one is still waiting on
    /// its week.
    Pending {
        /// Participants still active.
        active: usize,
    },
    /// This call completed the game.
    Completed(GameEntity),
    /// The game had already reached a terminal status.
    AlreadyFinal(GameEntity),
}

/// One line of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingEntry {
    /// The seat.
    pub participant: ParticipantEntity,
    /// Picks resolved as correct.
    pub correct_picks: u32,
    /// Teams spent, ordered by week and slot.
    pub used_teams: Vec<String>,
    /// Set for the sole survivor of a completed game.
    pub winner: bool,
}

/// Owns game status transitions and seat admission.
#[derive(Clone)]
pub struct GameLifecycle {
    store: Arc<dyn SurvivorStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    default_tie_policy: TiePolicy,
}

impl GameLifecycle {
    /// Lifecycle bound to `store`; `default_tie_policy` fills games created without one.
    pub fn new(
        store: Arc<dyn SurvivorStore>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        default_tie_policy: TiePolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            retry,
            default_tie_policy,
        }
    }

    /// Validate `settings` and store a new `open` game.
    pub async fn create_game(&self, settings: GameSettings) -> Result<GameEntity, ServiceError> {
        if !settings.is_consistent() {
            debug!(?settings, "rejecting inconsistent game settings");
            return Err(RuleViolation::InvalidConfiguration.into());
        }

        let now = self.clock.now();
        let game = GameEntity {
            id: Uuid::new_v4(),
            name: settings.name.trim().to_owned(),
            entry_fee_cents: settings.entry_fee_cents,
            prize_pool_cents: 0,
            capacity: settings.capacity,
            participant_count: 0,
            season: settings.season,
            start_week: settings.start_week,
            end_week: settings.end_week,
            two_pick_week: settings.two_pick_week,
            tie_policy: settings.tie_policy.unwrap_or(self.default_tie_policy),
            status: GameStatus::Open,
            winner: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            version: 0,
        };

        self.store.insert_game(game.clone()).await?;
        info!(game_id = %game.id, name = %game.name, capacity = game.capacity, "game created");
        Ok(game)
    }

    /// Admit `player_id` to an open game.
    ///
    /// The seat is reserved on the game counter first; if the participant insert then loses
    /// against a concurrent join of the same player, the seat is released again.
    pub async fn join_game(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<ParticipantEntity, ServiceError> {
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(ServiceError::InvalidInput("player id must not be empty".into()));
        }

        self.retry
            .run("join_game", || self.reserve_seat(game_id, player_id))
            .await?;

        let participant = ParticipantEntity {
            id: Uuid::new_v4(),
            game_id,
            player_id: player_id.to_owned(),
            status: ParticipantStatus::Active,
            eliminated_week: None,
            elimination_reason: None,
            joined_at: self.clock.now(),
            eliminated_at: None,
            version: 0,
        };

        match self.store.insert_participant(participant.clone()).await {
            Ok(()) => {
                info!(%game_id, player_id, participant_id = %participant.id, "player joined game");
                Ok(participant)
            }
            Err(err) => {
                if let Err(release_err) = self
                    .retry
                    .run("release_seat", || self.release_seat(game_id))
                    .await
                {
                    warn!(%game_id, error = %release_err, "failed to release reserved seat");
                }
                match err {
                    StorageError::Duplicate { .. } => Err(RuleViolation::AlreadyJoined.into()),
                    other => Err(other.into()),
                }
            }
        }
    }

    async fn reserve_seat(&self, game_id: Uuid, player_id: &str) -> Result<(), ServiceError> {
        let mut game = self.load_game(game_id).await?;
        if game.status != GameStatus::Open {
            return Err(RuleViolation::GameNotOpen.into());
        }
        if game.participant_count >= game.capacity {
            return Err(RuleViolation::GameFull.into());
        }
        if self
            .store
            .find_participant_by_player(game_id, player_id.to_owned())
            .await?
            .is_some()
        {
            return Err(RuleViolation::AlreadyJoined.into());
        }

        game.participant_count += 1;
        game.prize_pool_cents = game
            .entry_fee_cents
            .saturating_mul(u64::from(game.participant_count));
        game.updated_at = self.clock.now();
        self.store.update_game(game).await?;
        Ok(())
    }

    async fn release_seat(&self, game_id: Uuid) -> Result<(), ServiceError> {
        let mut game = self.load_game(game_id).await?;
        game.participant_count = game.participant_count.saturating_sub(1);
        game.prize_pool_cents = game
            .entry_fee_cents
            .saturating_mul(u64::from(game.participant_count));
        game.updated_at = self.clock.now();
        self.store.update_game(game).await?;
        Ok(())
    }

    /// Close joins and start counting weeks.
    pub async fn start_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        let game = self
            .retry
            .run("start_game", || self.try_activate(game_id, true))
            .await?;
        info!(%game_id, participants = game.participant_count, "game started");
        Ok(game)
    }

    /// Activate an open game ahead of result processing. Other statuses are returned unchanged.
    pub(crate) async fn activate(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.retry
            .run("activate_game", || async move {
                match self.try_activate(game_id, false).await {
                    Err(ServiceError::Rule(RuleViolation::GameNotOpen)) => {
                        self.load_game(game_id).await
                    }
                    other => other,
                }
            })
            .await
    }

    async fn try_activate(
        &self,
        game_id: Uuid,
        require_participants: bool,
    ) -> Result<GameEntity, ServiceError> {
        let mut game = self.load_game(game_id).await?;
        if game.status != GameStatus::Open {
            return Err(RuleViolation::GameNotOpen.into());
        }
        if require_participants && game.participant_count == 0 {
            return Err(RuleViolation::NoParticipants.into());
        }

        let now = self.clock.now();
        game.status = GameStatus::Active;
        game.started_at = Some(now);
        game.updated_at = now;
        Ok(self.store.update_game(game).await?)
    }

    /// Cancel a game that has not started.
    pub async fn cancel_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        let game = self
            .retry
            .run("cancel_game", || self.try_cancel(game_id))
            .await?;
        info!(%game_id, "game cancelled");
        Ok(game)
    }

    async fn try_cancel(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        let mut game = self.load_game(game_id).await?;
        if game.status != GameStatus::Open {
            return Err(RuleViolation::GameNotOpen.into());
        }
        game.status = GameStatus::Cancelled;
        game.updated_at = self.clock.now();
        Ok(self.store.update_game(game).await?)
    }

    /// Complete an active game once at most one participant is left standing.
    ///
    /// `awaiting` lists participants whose current week has not settled. The game stays open
    /// while the sole survivor is one of them.
    pub async fn finalize_if_complete(
        &self,
        game_id: Uuid,
        awaiting: &[Uuid],
    ) -> Result<Finalization, ServiceError> {
        let outcome = self
            .retry
            .run("finalize_game", || self.try_complete(game_id, false, awaiting))
            .await?;
        self.announce(&outcome).await;
        Ok(outcome)
    }

    /// Complete an active game after its last week even when several participants survived.
    pub async fn close_season(&self, game_id: Uuid) -> Result<Finalization, ServiceError> {
        let outcome = self
            .retry
            .run("close_season", || self.try_complete(game_id, true, &[]))
            .await?;
        self.announce(&outcome).await;
        Ok(outcome)
    }

    async fn try_complete(
        &self,
        game_id: Uuid,
        season_over: bool,
        awaiting: &[Uuid],
    ) -> Result<Finalization, ServiceError> {
        let mut game = self.load_game(game_id).await?;
        if game.status.is_terminal() {
            return Ok(Finalization::AlreadyFinal(game));
        }

        let active = self.active_participants(game_id).await?;
        let pending = Finalization::Pending {
            active: active.len(),
        };
        if game.status != GameStatus::Active {
            return Ok(pending);
        }
        if !season_over && !Self::is_decided(&active, awaiting) {
            debug!(%game_id, active = active.len(), "game not decided yet");
            return Ok(pending);
        }

        let now = self.clock.now();
        game.status = GameStatus::Completed;
        game.winner = match active.as_slice() {
            [sole] => Some(sole.id),
            _ => None,
        };
        game.completed_at = Some(now);
        game.updated_at = now;
        Ok(Finalization::Completed(self.store.update_game(game).await?))
    }

    /// At most one survivor, and not one whose week is still open.
    fn is_decided(active: &[ParticipantEntity], awaiting: &[Uuid]) -> bool {
        match active {
            [] => true,
            [sole] => !awaiting.contains(&sole.id),
            _ => false,
        }
    }

    async fn announce(&self, outcome: &Finalization) {
        let Finalization::Completed(game) = outcome else {
            return;
        };

        let survivors = match self.active_participants(game.id).await {
            Ok(active) => active.into_iter().map(|participant| participant.id).collect(),
            Err(err) => {
                warn!(game_id = %game.id, error = %err, "failed to list survivors for notification");
                Vec::new()
            }
        };
        info!(
            game_id = %game.id,
            winner = ?game.winner,
            survivors = survivors.len(),
            "game completed"
        );
        self.notifier.notify(Notification::GameCompleted {
            game_id: game.id,
            winner: game.winner,
            survivors,
        });
    }

    /// Game by id, or `NotFound`.
    pub async fn get_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.load_game(game_id).await
    }

    /// Every game, oldest first.
    pub async fn list_games(&self) -> Result<Vec<GameEntity>, ServiceError> {
        Ok(self.store.list_games().await?)
    }

    /// Seats of a game in join order.
    pub async fn list_participants(
        &self,
        game_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, ServiceError> {
        self.load_game(game_id).await?;
        Ok(self.store.list_participants(game_id).await?)
    }

    /// Leaderboard: survivors first, then by how long each participant lasted.
    pub async fn standings(
        &self,
        game_id: Uuid,
    ) -> Result<(GameEntity, Vec<StandingEntry>), ServiceError> {
        let game = self.load_game(game_id).await?;
        let participants = self.store.list_participants(game_id).await?;

        let mut entries = Vec::with_capacity(participants.len());
        for participant in participants {
            let mut picks = self.store.list_picks_for_participant(participant.id).await?;
            picks.sort_by_key(|pick| (pick.week, pick.slot));
            entries.push(StandingEntry {
                correct_picks: picks.iter().filter(|pick| pick.correct == Some(true)).count()
                    as u32,
                used_teams: picks.into_iter().map(|pick| pick.team_id).collect(),
                winner: game.winner == Some(participant.id),
                participant,
            });
        }

        // Stable sort keeps join order among equals.
        entries.sort_by_key(|entry| {
            (
                Reverse(entry.winner),
                Reverse(entry.participant.is_active()),
                Reverse(entry.participant.eliminated_week.unwrap_or(0)),
                Reverse(entry.correct_picks),
            )
        });
        Ok((game, entries))
    }

    async fn active_participants(
        &self,
        game_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, ServiceError> {
        let participants = self.store.list_participants(game_id).await?;
        Ok(participants
            .into_iter()
            .filter(ParticipantEntity::is_active)
            .collect())
    }

    pub(crate) async fn load_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.store
            .find_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}`")))
    }
}
