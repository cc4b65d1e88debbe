//! Shared fixtures for service tests.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use uuid::Uuid;

use crate::{
    dao::{
        models::{
            EliminationReason, GameEntity, MatchupEntity, ParticipantEntity, ParticipantStatus,
            PickEntity, TiePolicy,
        },
        survivor_store::{SurvivorStore, memory::InMemorySurvivorStore},
    },
    services::{
        lifecycle::GameSettings,
        notifications::{Notification, NotificationSink},
        retry::RetryPolicy,
        survivor_core::{CoreDeps, SurvivorCore},
    },
    state::clock::{Clock, FixedClock},
};

pub const SEASON: u16 = 2024;
const DAY_SECS: u64 = 86_400;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Settings for an 18-week game starting at week 1.
pub fn settings(capacity: u32, two_pick_week: u32) -> GameSettings {
    GameSettings {
        name: "Office pool".into(),
        entry_fee_cents: 2_500,
        capacity,
        season: SEASON,
        start_week: 1,
        end_week: 18,
        two_pick_week,
        tie_policy: None,
    }
}

pub struct Harness {
    pub store: Arc<dyn SurvivorStore>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub core: SurvivorCore,
}

impl Harness {
    pub fn new() -> Self {
        let store: Arc<dyn SurvivorStore> = Arc::new(InMemorySurvivorStore::new());
        let clock = Arc::new(FixedClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_725_000_000),
        ));
        let sink = Arc::new(RecordingSink::default());
        let core = SurvivorCore::new(CoreDeps {
            store: store.clone(),
            notifier: sink.clone(),
            clock: clock.clone(),
            retry: RetryPolicy::immediate(16),
            default_tie_policy: TiePolicy::Eliminate,
        });
        Self {
            store,
            clock,
            sink,
            core,
        }
    }

    /// Create a game, join `players` in order and start it.
    pub async fn started_game(
        &self,
        settings: GameSettings,
        players: &[&str],
    ) -> (GameEntity, Vec<ParticipantEntity>) {
        let game = self.core.create_game(settings).await.expect("game created");
        let mut participants = Vec::new();
        for player in players {
            participants.push(self.core.join_game(game.id, player).await.expect("player joins"));
        }
        let game = self.core.start_game(game.id).await.expect("game started");
        (game, participants)
    }

    /// Schedule a matchup kicking off `days` from the current clock (negative: already started).
    pub async fn schedule(&self, id: &str, week: u32, home: &str, away: &str, days: i64) {
        let now = self.clock.now();
        let offset = Duration::from_secs(days.unsigned_abs() * DAY_SECS);
        let scheduled_start = if days >= 0 { now + offset } else { now - offset };
        self.store
            .save_matchup(MatchupEntity {
                id: id.into(),
                season: SEASON,
                week,
                home_team: home.into(),
                away_team: away.into(),
                home_score: None,
                away_score: None,
                complete: false,
                scheduled_start,
            })
            .await
            .expect("matchup saved");
    }

    pub async fn finish(&self, id: &str, home_score: u32, away_score: u32) {
        let mut matchup = self
            .store
            .find_matchup(id.into())
            .await
            .expect("matchup read")
            .expect("matchup exists");
        matchup.home_score = Some(home_score);
        matchup.away_score = Some(away_score);
        matchup.complete = true;
        self.store.save_matchup(matchup).await.expect("matchup saved");
    }

    pub async fn participant(&self, id: Uuid) -> ParticipantEntity {
        self.store
            .find_participant(id)
            .await
            .expect("participant read")
            .expect("participant exists")
    }

    /// Mark a participant eliminated directly in the store.
    pub async fn force_eliminate(&self, participant: &ParticipantEntity, week: u32) {
        let mut current = self.participant(participant.id).await;
        current.status = ParticipantStatus::Eliminated;
        current.eliminated_week = Some(week);
        current.elimination_reason = Some(EliminationReason::IncorrectPick);
        self.store
            .update_participant(current)
            .await
            .expect("participant updated");
    }

    /// Store a pick without any validation.
    pub async fn insert_raw_pick(
        &self,
        participant: &ParticipantEntity,
        week: u32,
        slot: u8,
        team: &str,
        matchup: &str,
    ) {
        self.store
            .upsert_pick(PickEntity {
                id: Uuid::new_v4(),
                game_id: participant.game_id,
                participant_id: participant.id,
                matchup_id: matchup.into(),
                team_id: team.into(),
                week,
                slot,
                correct: None,
                submitted_at: SystemTime::UNIX_EPOCH,
                resolved_at: None,
            })
            .await
            .expect("raw pick stored");
    }

    /// Participants, picks and game as persisted.
    pub async fn snapshot(
        &self,
        game_id: Uuid,
    ) -> (Vec<ParticipantEntity>, Vec<Vec<PickEntity>>, GameEntity) {
        let participants = self
            .store
            .list_participants(game_id)
            .await
            .expect("participants read");
        let mut picks = Vec::new();
        for participant in &participants {
            picks.push(
                self.store
                    .list_picks_for_participant(participant.id)
                    .await
                    .expect("picks read"),
            );
        }
        let game = self
            .store
            .find_game(game_id)
            .await
            .expect("game read")
            .expect("game exists");
        (participants, picks, game)
    }
}
