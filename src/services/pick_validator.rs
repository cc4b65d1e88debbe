use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, GameStatus, MatchupEntity, ParticipantEntity, PickEntity},
        storage::StorageError,
        survivor_store::SurvivorStore,
    },
    error::{RuleViolation, ServiceError},
    services::team_ledger::{TeamLedger, TeamUsage, conflicting_use},
    state::clock::Clock,
};

/// A participant's choice for one week slot.
#[derive(Debug, Clone)]
pub struct PickSubmission {
    /// Game the pick is for.
    pub game_id: Uuid,
    /// Player submitting it.
    pub player_id: String,
    /// Week it counts for.
    pub week: u32,
    /// Team code, normalized before any check.
    pub team_id: String,
    /// Matchup the team plays in.
    pub matchup_id: String,
    /// 1, or 2 from the two-pick week onward.
    pub slot: u8,
}

/// Normalise a team code to its stored form.
pub fn normalize_team(team_id: &str) -> String {
    team_id.trim().to_ascii_uppercase()
}

/// Accepts or rejects weekly picks.
#[derive(Clone)]
pub struct PickValidator {
    store: Arc<dyn SurvivorStore>,
    clock: Arc<dyn Clock>,
    ledger: TeamLedger,
}

impl PickValidator {
    /// Validator checking against `store` at the time given by `clock`.
    pub fn new(store: Arc<dyn SurvivorStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: TeamLedger::new(store.clone()),
            store,
            clock,
        }
    }

    /// Validate and store a pick, overwriting the one already held in the same week and slot.
    ///
    /// Checks run in a fixed order and the first failing one is reported.
    pub async fn submit_pick(&self, submission: PickSubmission) -> Result<PickEntity, ServiceError> {
        let result = self.try_submit(&submission).await;
        if let Err(ServiceError::Rule(rule)) = &result {
            debug!(
                game_id = %submission.game_id,
                player_id = %submission.player_id,
                week = submission.week,
                team_id = %submission.team_id,
                code = rule.code(),
                "pick rejected"
            );
        }
        result
    }

    async fn try_submit(&self, submission: &PickSubmission) -> Result<PickEntity, ServiceError> {
        let team_id = normalize_team(&submission.team_id);
        let matchup_id = submission.matchup_id.trim().to_owned();
        let week = submission.week;
        let slot = submission.slot;

        let game = self.load_game(submission.game_id).await?;
        if !matches!(game.status, GameStatus::Open | GameStatus::Active) {
            return Err(RuleViolation::GameNotActive.into());
        }

        let participant = self
            .store
            .find_participant_by_player(game.id, submission.player_id.trim().to_owned())
            .await?
            .filter(ParticipantEntity::is_active)
            .ok_or(RuleViolation::NotActiveParticipant)?;
        if !game.covers_week(week) {
            return Err(RuleViolation::WeekOutOfRange.into());
        }

        let now = self.clock.now();
        let matchup = self
            .store
            .find_matchup(matchup_id.clone())
            .await?
            .ok_or(RuleViolation::MatchupLocked)?;
        if matchup.season != game.season || matchup.week != week {
            return Err(RuleViolation::MatchupWeekMismatch.into());
        }
        if matchup.is_locked_at(now) {
            return Err(RuleViolation::MatchupLocked.into());
        }

        let existing = self.store.list_picks_for_participant(participant.id).await?;
        if let Some(current) = existing
            .iter()
            .find(|pick| pick.week == week && pick.slot == slot)
        {
            if self.replaced_pick_is_locked(current, &matchup).await? {
                return Err(RuleViolation::MatchupLocked.into());
            }
        }

        if !matchup.involves(&team_id) {
            return Err(RuleViolation::TeamNotInMatchup.into());
        }
        if conflicting_use(&existing, &team_id, week, slot).is_some() {
            return Err(RuleViolation::TeamAlreadyUsed.into());
        }
        if !(1..=game.required_picks(week)).contains(&slot) {
            return Err(RuleViolation::InvalidSlotForWeek.into());
        }

        let pick = PickEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            participant_id: participant.id,
            matchup_id,
            team_id,
            week,
            slot,
            correct: None,
            submitted_at: now,
            resolved_at: None,
        };

        let stored = match self.store.upsert_pick(pick).await {
            Ok(stored) => stored,
            Err(StorageError::Duplicate { .. }) => {
                return Err(RuleViolation::TeamAlreadyUsed.into());
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            game_id = %game.id,
            participant_id = %participant.id,
            week,
            slot,
            team_id = %stored.team_id,
            "pick stored"
        );
        Ok(stored)
    }

    /// Whether the pick about to be overwritten can no longer change.
    async fn replaced_pick_is_locked(
        &self,
        current: &PickEntity,
        target: &MatchupEntity,
    ) -> Result<bool, ServiceError> {
        if current.correct.is_some() {
            return Ok(true);
        }
        if current.matchup_id == target.id {
            return Ok(false);
        }
        let now = self.clock.now();
        Ok(self
            .store
            .find_matchup(current.matchup_id.clone())
            .await?
            .is_some_and(|matchup| matchup.is_locked_at(now)))
    }

    /// Every pick of the player in this game, ordered by week then slot.
    pub async fn picks_for_player(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<Vec<PickEntity>, ServiceError> {
        let participant = self.participant_for(game_id, player_id).await?;
        let mut picks = self.store.list_picks_for_participant(participant.id).await?;
        picks.sort_by_key(|pick| (pick.week, pick.slot));
        Ok(picks)
    }

    /// Teams spent by a player in a game.
    pub async fn team_usage(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<Vec<TeamUsage>, ServiceError> {
        let participant = self.participant_for(game_id, player_id).await?;
        self.ledger.used_teams(participant.id).await
    }

    async fn participant_for(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<ParticipantEntity, ServiceError> {
        self.load_game(game_id).await?;
        self.store
            .find_participant_by_player(game_id, player_id.trim().to_owned())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` in game `{game_id}`")))
    }

    async fn load_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.store
            .find_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}`")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::test_support::{Harness, settings};

    fn submission(game_id: Uuid, player: &str, week: u32, team: &str, matchup: &str, slot: u8) -> PickSubmission {
        PickSubmission {
            game_id,
            player_id: player.into(),
            week,
            team_id: team.into(),
            matchup_id: matchup.into(),
            slot,
        }
    }

    #[tokio::test]
    async fn valid_pick_is_stored_with_normalised_team() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(4, 12), &["alice"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 2).await;

        let pick = harness
            .core
            .picks
            .submit_pick(submission(game.id, "alice", 1, " kc ", "kc-den", 1))
            .await
            .expect("pick stored");

        assert_eq!(pick.team_id, "KC");
        assert_eq!(pick.correct, None);
    }

    #[tokio::test]
    async fn checks_run_in_order() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(4, 12), &["alice", "bob"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 2).await;
        harness.schedule("buf-mia", 1, "MIA", "BUF", -1).await;
        harness.force_eliminate(&players[1], 1).await;
        let picks = &harness.core.picks;

        let cases = [
            (submission(game.id, "bob", 1, "KC", "kc-den", 1), RuleViolation::NotActiveParticipant),
            (submission(game.id, "zed", 1, "KC", "kc-den", 1), RuleViolation::NotActiveParticipant),
            (submission(game.id, "alice", 20, "KC", "kc-den", 1), RuleViolation::WeekOutOfRange),
            (submission(game.id, "alice", 1, "KC", "nope", 1), RuleViolation::MatchupLocked),
            (submission(game.id, "alice", 1, "BUF", "buf-mia", 1), RuleViolation::MatchupLocked),
            (submission(game.id, "alice", 2, "KC", "kc-den", 1), RuleViolation::MatchupWeekMismatch),
            (submission(game.id, "alice", 1, "PHI", "kc-den", 1), RuleViolation::TeamNotInMatchup),
            (submission(game.id, "alice", 1, "KC", "kc-den", 2), RuleViolation::InvalidSlotForWeek),
        ];

        for (input, expected) in cases {
            let err = picks.submit_pick(input.clone()).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Rule(rule) if rule == expected),
                "{input:?} should fail with {expected:?}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn team_cannot_be_reused_in_a_later_week() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(4, 12), &["alice"]).await;
        harness.schedule("w1-kc-den", 1, "DEN", "KC", 2).await;
        harness.schedule("w5-kc-lv", 5, "LV", "KC", 30).await;
        let picks = &harness.core.picks;

        picks
            .submit_pick(submission(game.id, "alice", 1, "KC", "w1-kc-den", 1))
            .await
            .expect("week 1 pick");
        let err = picks
            .submit_pick(submission(game.id, "alice", 5, "KC", "w5-kc-lv", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::TeamAlreadyUsed)));

        let usage = picks.team_usage(game.id, "alice").await.expect("usage");
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].week, 1);
    }

    #[tokio::test]
    async fn resubmission_before_kickoff_overwrites_the_slot() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(4, 12), &["alice"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 2).await;
        let picks = &harness.core.picks;

        let first = picks
            .submit_pick(submission(game.id, "alice", 1, "KC", "kc-den", 1))
            .await
            .expect("first pick");
        let second = picks
            .submit_pick(submission(game.id, "alice", 1, "DEN", "kc-den", 1))
            .await
            .expect("overwrite");
        let same = picks
            .submit_pick(submission(game.id, "alice", 1, "DEN", "kc-den", 1))
            .await
            .expect("same team again");

        assert_eq!(first.id, second.id);
        assert_eq!(second.id, same.id);
        let stored = picks.picks_for_player(game.id, "alice").await.expect("picks");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].team_id, "DEN");
    }

    #[tokio::test]
    async fn locked_pick_cannot_be_moved_to_a_later_matchup() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(4, 12), &["alice"]).await;
        harness.schedule("thu", 1, "DEN", "KC", 1).await;
        harness.schedule("sun", 1, "MIA", "BUF", 4).await;
        let picks = &harness.core.picks;

        picks
            .submit_pick(submission(game.id, "alice", 1, "KC", "thu", 1))
            .await
            .expect("thursday pick");
        harness.clock.advance(Duration::from_secs(2 * 86_400));

        let err = picks
            .submit_pick(submission(game.id, "alice", 1, "BUF", "sun", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::MatchupLocked)));
    }

    #[tokio::test]
    async fn second_slot_opens_at_the_two_pick_week() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(4, 12), &["alice"]).await;
        harness.schedule("w12-a", 12, "DEN", "KC", 80).await;
        harness.schedule("w12-b", 12, "MIA", "BUF", 80).await;
        let picks = &harness.core.picks;

        picks
            .submit_pick(submission(game.id, "alice", 12, "KC", "w12-a", 1))
            .await
            .expect("slot 1");
        picks
            .submit_pick(submission(game.id, "alice", 12, "BUF", "w12-b", 2))
            .await
            .expect("slot 2");
        let err = picks
            .submit_pick(submission(game.id, "alice", 12, "MIA", "w12-b", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::InvalidSlotForWeek)));
    }

    #[tokio::test]
    async fn cancelled_game_accepts_no_picks() {
        let harness = Harness::new();
        let game = harness
            .core
            .lifecycle
            .create_game(settings(4, 12))
            .await
            .expect("game");
        harness.core.lifecycle.cancel_game(game.id).await.expect("cancel");

        let err = harness
            .core
            .picks
            .submit_pick(submission(game.id, "alice", 1, "KC", "kc-den", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::GameNotActive)));
    }
}
