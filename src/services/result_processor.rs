//! Settles one week of a game: resolves picks against final scores and decides who is out.
//!
//! Every step reads persisted state and writes with compare-and-set guards, so a week can be
//! processed any number of times and converges on the same stored result.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            EliminationReason, GameEntity, GameStatus, MatchupEntity, ParticipantEntity, PickEntity,
        },
        survivor_store::SurvivorStore,
    },
    error::{InvariantViolation, RuleViolation, ServiceError},
    services::{
        elimination::{EliminationTracker, PendingElimination},
        lifecycle::GameLifecycle,
        result_resolver::resolve,
    },
    state::clock::Clock,
};

/// Summary of one `process_week` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeekReport {
    /// Processed game.
    pub game_id: Uuid,
    /// Processed week.
    pub week: u32,
    /// Picks whose correctness was written by this run.
    pub picks_resolved: u32,
    /// Participants eliminated by this run.
    pub participants_eliminated: Vec<Uuid>,
    /// Participants left unevaluated because of missing data or a storage failure.
    pub skipped: Vec<Uuid>,
    /// Participants still waiting on unfinished matchups.
    pub pending: Vec<Uuid>,
    /// Inconsistent records; the participants involved are left untouched.
    pub invariant_violations: Vec<InvariantViolation>,
    /// Whether the game is completed after this run.
    pub game_completed: bool,
    /// Sole survivor of a completed game.
    pub winner: Option<Uuid>,
}

/// Decision for one participant in one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Survived,
    Pending,
    Eliminate(EliminationReason),
}

#[derive(Debug)]
enum Unevaluated {
    Skip(String),
    Invariant(InvariantViolation),
}

/// Data shared by every participant evaluation of a week.
struct WeekContext<'a> {
    game: &'a GameEntity,
    week: u32,
    matchups: &'a HashMap<String, MatchupEntity>,
    week_locked: bool,
}

impl WeekContext<'_> {
    fn evaluate(
        &self,
        participant: &ParticipantEntity,
        picks: &[&PickEntity],
    ) -> Result<Verdict, Unevaluated> {
        let violation = |detail: String| {
            Unevaluated::Invariant(InvariantViolation {
                participant_id: participant.id,
                week: self.week,
                detail,
            })
        };
        let required = self.game.required_picks(self.week);

        let mut slots = HashSet::new();
        let mut losing = None;
        let mut unresolved = false;
        for pick in picks {
            if pick.slot == 0 || pick.slot > required {
                return Err(violation(format!(
                    "pick {} uses slot {} but week allows {required}",
                    pick.id, pick.slot
                )));
            }
            if !slots.insert(pick.slot) {
                return Err(violation(format!("slot {} holds two picks", pick.slot)));
            }

            let Some(matchup) = self.matchups.get(&pick.matchup_id) else {
                return Err(Unevaluated::Skip(format!(
                    "matchup `{}` of pick {} is unknown",
                    pick.matchup_id, pick.id
                )));
            };
            if !matchup.involves(&pick.team_id) {
                return Err(violation(format!(
                    "pick {} backs {} which does not play in `{}`",
                    pick.id, pick.team_id, matchup.id
                )));
            }

            match pick.correct {
                Some(_) if !matchup.complete => {
                    return Err(violation(format!(
                        "pick {} is resolved but `{}` is not complete",
                        pick.id, matchup.id
                    )));
                }
                Some(false) => {
                    let reason = resolve(matchup)
                        .map(|resolution| resolution.elimination_reason())
                        .map_err(|err| Unevaluated::Skip(err.to_string()))?;
                    // A loss outranks a tie when both slots failed.
                    if losing != Some(EliminationReason::IncorrectPick) {
                        losing = Some(reason);
                    }
                }
                Some(true) => {}
                None => unresolved = true,
            }
        }

        if let Some(reason) = losing {
            return Ok(Verdict::Eliminate(reason));
        }
        if unresolved {
            return Ok(Verdict::Pending);
        }
        if picks.len() < usize::from(required) {
            return Ok(if self.week_locked {
                Verdict::Eliminate(EliminationReason::MissingPick)
            } else {
                Verdict::Pending
            });
        }
        Ok(Verdict::Survived)
    }
}

/// Whether every matchup of the week has kicked off or finished.
pub fn week_is_locked<'a>(
    matchups: impl IntoIterator<Item = &'a MatchupEntity>,
    now: SystemTime,
) -> bool {
    let mut scheduled = false;
    for matchup in matchups {
        if !matchup.is_locked_at(now) {
            return false;
        }
        scheduled = true;
    }
    scheduled
}

/// Turns final scores into resolved picks and eliminations.
#[derive(Clone)]
pub struct WeeklyResultProcessor {
    store: Arc<dyn SurvivorStore>,
    clock: Arc<dyn Clock>,
    lifecycle: GameLifecycle,
    eliminations: EliminationTracker,
}

impl WeeklyResultProcessor {
    /// Processor sharing the lifecycle and tracker of the engine.
    pub fn new(
        store: Arc<dyn SurvivorStore>,
        clock: Arc<dyn Clock>,
        lifecycle: GameLifecycle,
        eliminations: EliminationTracker,
    ) -> Self {
        Self {
            store,
            clock,
            lifecycle,
            eliminations,
        }
    }

    /// Resolve, evaluate and eliminate for one week, then finalize the game when it is decided.
    ///
    /// Safe to run repeatedly and concurrently: a second run over the same data changes nothing.
    pub async fn process_week(&self, game_id: Uuid, week: u32) -> Result<WeekReport, ServiceError> {
        let mut game = self.lifecycle.load_game(game_id).await?;
        let mut report = WeekReport {
            game_id,
            week,
            ..WeekReport::default()
        };

        match game.status {
            GameStatus::Cancelled => return Err(RuleViolation::GameNotActive.into()),
            GameStatus::Completed => {
                // Late scores still settle the remaining picks of a decided game.
                let matchups = self.load_matchups(&game, week).await?;
                self.resolve_open_picks(&game, week, &matchups, &mut report).await?;
                report.game_completed = true;
                report.winner = game.winner;
                return Ok(report);
            }
            GameStatus::Open | GameStatus::Active => {}
        }
        if !game.covers_week(week) {
            return Err(RuleViolation::WeekOutOfRange.into());
        }
        if game.status == GameStatus::Open {
            game = self.lifecycle.activate(game_id).await?;
            info!(%game_id, week, "game activated by result processing");
        }

        let participants = self.store.list_participants(game_id).await?;
        let matchups = self.load_matchups(&game, week).await?;
        let week_locked = week_is_locked(matchups.values(), self.clock.now());
        let skipped = self.resolve_open_picks(&game, week, &matchups, &mut report).await?;

        // Evaluate from what is persisted, including picks resolved by a concurrent run.
        let picks = self.store.list_picks_for_week(game_id, week).await?;
        let mut by_participant: BTreeMap<Uuid, Vec<&PickEntity>> = BTreeMap::new();
        for pick in &picks {
            by_participant.entry(pick.participant_id).or_default().push(pick);
        }

        let context = WeekContext {
            game: &game,
            week,
            matchups: &matchups,
            week_locked,
        };
        let mut batch = Vec::new();
        for participant in participants.iter().filter(|participant| participant.is_active()) {
            if skipped.contains(&participant.id) {
                report.skipped.push(participant.id);
                continue;
            }
            let own = by_participant
                .get(&participant.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            match context.evaluate(participant, own) {
                Ok(Verdict::Survived) => {}
                Ok(Verdict::Pending) => report.pending.push(participant.id),
                Ok(Verdict::Eliminate(reason)) => batch.push(PendingElimination {
                    participant_id: participant.id,
                    reason,
                }),
                Err(Unevaluated::Skip(reason)) => {
                    warn!(%game_id, week, participant_id = %participant.id, %reason, "participant skipped");
                    report.skipped.push(participant.id);
                }
                Err(Unevaluated::Invariant(violation)) => {
                    error!(%game_id, week, participant_id = %participant.id, %violation, "invariant violated");
                    report.invariant_violations.push(violation);
                }
            }
        }

        // A failed elimination leaves its target active; it must not win by default.
        let awaiting: Vec<Uuid> = report
            .pending
            .iter()
            .chain(&report.skipped)
            .copied()
            .chain(report.invariant_violations.iter().map(|violation| violation.participant_id))
            .chain(batch.iter().map(|entry| entry.participant_id))
            .collect();
        let outcome = self
            .eliminations
            .eliminate_batch(game_id, week, &batch, &awaiting)
            .await?;
        report.participants_eliminated = outcome.eliminated;
        report.skipped.extend(outcome.failed);

        if batch.is_empty() {
            self.finalize_leftover(&game, &participants, &awaiting).await?;
        }
        let settled = week_locked
            && report.pending.is_empty()
            && report.skipped.is_empty()
            && report.invariant_violations.is_empty();
        if week == game.end_week && settled {
            self.lifecycle.close_season(game_id).await?;
        }

        let game = self.lifecycle.load_game(game_id).await?;
        report.game_completed = game.status == GameStatus::Completed;
        report.winner = game.winner;
        info!(
            %game_id,
            week,
            picks_resolved = report.picks_resolved,
            eliminated = report.participants_eliminated.len(),
            pending = report.pending.len(),
            skipped = report.skipped.len(),
            invariant_violations = report.invariant_violations.len(),
            completed = report.game_completed,
            "week processed"
        );
        Ok(report)
    }

    async fn load_matchups(
        &self,
        game: &GameEntity,
        week: u32,
    ) -> Result<HashMap<String, MatchupEntity>, ServiceError> {
        let matchups = self.store.list_matchups(game.season, week).await?;
        Ok(matchups
            .into_iter()
            .map(|matchup| (matchup.id.clone(), matchup))
            .collect())
    }

    /// Resolve every open pick of the week whose matchup is final. Returns the participants
    /// holding a pick that could not be resolved.
    async fn resolve_open_picks(
        &self,
        game: &GameEntity,
        week: u32,
        matchups: &HashMap<String, MatchupEntity>,
        report: &mut WeekReport,
    ) -> Result<HashSet<Uuid>, ServiceError> {
        let now = self.clock.now();
        let mut skipped = HashSet::new();
        let picks = self.store.list_picks_for_week(game.id, week).await?;
        for pick in picks.iter().filter(|pick| pick.correct.is_none()) {
            match self.resolve_pick(game, pick, matchups, now).await {
                Ok(true) => report.picks_resolved += 1,
                Ok(false) => {}
                Err(reason) => {
                    warn!(game_id = %game.id, week, pick_id = %pick.id, %reason, "pick left unresolved");
                    skipped.insert(pick.participant_id);
                }
            }
        }
        Ok(skipped)
    }

    /// Write the correctness of one pick. `Ok(false)` when it is not resolvable yet or was
    /// already resolved by someone else.
    async fn resolve_pick(
        &self,
        game: &GameEntity,
        pick: &PickEntity,
        matchups: &HashMap<String, MatchupEntity>,
        now: SystemTime,
    ) -> Result<bool, String> {
        let Some(matchup) = matchups.get(&pick.matchup_id) else {
            return Err(format!("matchup `{}` is unknown", pick.matchup_id));
        };
        if !matchup.complete {
            return Ok(false);
        }
        if !matchup.involves(&pick.team_id) {
            // Left for the evaluation step to report as an invariant violation.
            return Ok(false);
        }
        let resolution = resolve(matchup).map_err(|err| err.to_string())?;
        let correct = resolution.is_correct_for(&pick.team_id, game.tie_policy);
        self.store
            .resolve_pick(pick.id, correct, now)
            .await
            .map_err(|err| err.to_string())
    }

    /// Complete a game left with at most one survivor by an earlier interrupted run.
    async fn finalize_leftover(
        &self,
        game: &GameEntity,
        participants: &[ParticipantEntity],
        awaiting: &[Uuid],
    ) -> Result<(), ServiceError> {
        let active = participants.iter().filter(|participant| participant.is_active()).count();
        let any_eliminated = participants.len() > active;
        if active <= 1 && any_eliminated {
            self.lifecycle.finalize_if_complete(game.id, awaiting).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::models::{ParticipantStatus, TiePolicy},
        services::{
            notifications::Notification,
            pick_validator::PickSubmission,
            test_support::{Harness, settings},
        },
    };

    const DAY: Duration = Duration::from_secs(86_400);

    async fn pick(harness: &Harness, game_id: Uuid, player: &str, week: u32, team: &str, matchup: &str, slot: u8) {
        harness
            .core
            .picks
            .submit_pick(PickSubmission {
                game_id,
                player_id: player.into(),
                week,
                team_id: team.into(),
                matchup_id: matchup.into(),
                slot,
            })
            .await
            .expect("pick accepted");
    }

    #[tokio::test]
    async fn loser_is_eliminated_and_winner_crowned() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(2, 12), &["alice", "bob"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "kc-den", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 20, 27).await;

        let report = harness.core.results.process_week(game.id, 1).await.expect("processed");

        assert_eq!(report.picks_resolved, 2);
        assert_eq!(report.participants_eliminated, vec![players[1].id]);
        assert!(report.game_completed);
        assert_eq!(report.winner, Some(players[0].id));

        let bob = harness.participant(players[1].id).await;
        assert_eq!(bob.status, ParticipantStatus::Eliminated);
        assert_eq!(bob.elimination_reason, Some(EliminationReason::IncorrectPick));
    }

    #[tokio::test]
    async fn reprocessing_a_week_changes_nothing() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        harness.schedule("buf-mia", 1, "MIA", "BUF", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "BUF", "buf-mia", 1).await;
        pick(&harness, game.id, "carol", 1, "DEN", "kc-den", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 20, 27).await;
        harness.finish("buf-mia", 10, 31).await;

        let first = harness.core.results.process_week(game.id, 1).await.expect("first run");
        let snapshot = harness.snapshot(game.id).await;
        let second = harness.core.results.process_week(game.id, 1).await.expect("second run");

        assert_eq!(first.participants_eliminated.len(), 1);
        assert_eq!(second.picks_resolved, 0);
        assert!(second.participants_eliminated.is_empty());
        assert_eq!(harness.snapshot(game.id).await, snapshot);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_eliminate_and_complete_once() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        harness.schedule("buf-mia", 1, "MIA", "BUF", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "kc-den", 1).await;
        pick(&harness, game.id, "carol", 1, "MIA", "buf-mia", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 20, 27).await;
        harness.finish("buf-mia", 10, 31).await;
        harness.sink.take();

        let game_id = game.id;
        let runs: Vec<_> = (0..6)
            .map(|_| {
                let core = harness.core.clone();
                tokio::spawn(async move { core.results.process_week(game_id, 1).await })
            })
            .collect();
        for run in futures::future::join_all(runs).await {
            let report = run.expect("task joined").expect("processed");
            assert!(report.game_completed);
            assert_eq!(report.winner, Some(players[0].id));
        }

        let events = harness.sink.take();
        let mut eliminated: Vec<Uuid> = events
            .iter()
            .filter_map(|event| match event {
                Notification::ParticipantEliminated { participant_id, .. } => Some(*participant_id),
                Notification::GameCompleted { .. } => None,
            })
            .collect();
        eliminated.sort();
        let mut losers = vec![players[1].id, players[2].id];
        losers.sort();
        assert_eq!(eliminated, losers);
        let completed = events
            .iter()
            .filter(|event| matches!(event, Notification::GameCompleted { .. }))
            .count();
        assert_eq!(completed, 1);

        let snapshot = harness.snapshot(game.id).await;
        let extra = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(extra.picks_resolved, 0);
        assert_eq!(harness.snapshot(game.id).await, snapshot);
        assert!(harness.sink.take().is_empty());
    }

    #[tokio::test]
    async fn tie_eliminates_both_sides_by_default() {
        let harness = Harness::new();
        let (game, _) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        harness.schedule("buf-mia", 1, "MIA", "BUF", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "kc-den", 1).await;
        pick(&harness, game.id, "carol", 1, "BUF", "buf-mia", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 17, 17).await;
        harness.finish("buf-mia", 3, 24).await;

        let report = harness.core.results.process_week(game.id, 1).await.expect("processed");

        assert_eq!(report.participants_eliminated.len(), 2);
        for participant in harness.snapshot(game.id).await.0 {
            if participant.player_id != "carol" {
                assert_eq!(participant.elimination_reason, Some(EliminationReason::TiedPick));
            }
        }
        assert!(report.game_completed);
    }

    #[tokio::test]
    async fn tie_survives_under_survive_policy() {
        let harness = Harness::new();
        let mut config = settings(2, 12);
        config.tie_policy = Some(TiePolicy::Survive);
        let (game, _) = harness.started_game(config, &["alice", "bob"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "kc-den", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 17, 17).await;

        let report = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert!(report.participants_eliminated.is_empty());
        assert!(!report.game_completed);
    }

    #[tokio::test]
    async fn missing_pick_waits_for_the_week_to_lock() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("thu", 1, "DEN", "KC", 1).await;
        harness.schedule("sun", 1, "MIA", "BUF", 4).await;
        pick(&harness, game.id, "alice", 1, "KC", "thu", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "thu", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("thu", 10, 24).await;

        let early = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(early.participants_eliminated, vec![players[1].id]);
        assert_eq!(early.pending, vec![players[2].id]);

        harness.clock.advance(3 * DAY);
        let late = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(late.participants_eliminated, vec![players[2].id]);
        assert_eq!(
            harness.participant(players[2].id).await.elimination_reason,
            Some(EliminationReason::MissingPick)
        );
        assert_eq!(late.winner, Some(players[0].id));
    }

    #[tokio::test]
    async fn survivor_on_an_unfinished_matchup_is_not_crowned_early() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("thu", 1, "DEN", "KC", 1).await;
        harness.schedule("sun", 1, "MIA", "BUF", 4).await;
        pick(&harness, game.id, "alice", 1, "BUF", "sun", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "thu", 1).await;
        pick(&harness, game.id, "carol", 1, "DEN", "thu", 1).await;
        harness.clock.advance(2 * DAY);
        harness.finish("thu", 10, 24).await;

        let thursday = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(thursday.participants_eliminated, vec![players[1].id, players[2].id]);
        assert_eq!(thursday.pending, vec![players[0].id]);
        assert!(!thursday.game_completed);
        assert_eq!(thursday.winner, None);

        harness.clock.advance(3 * DAY);
        harness.finish("sun", 24, 10).await;
        let sunday = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(sunday.participants_eliminated, vec![players[0].id]);
        assert!(sunday.game_completed);
        assert_eq!(sunday.winner, None);

        let (_, picks, _) = harness.snapshot(game.id).await;
        assert!(picks.iter().flatten().all(|pick| pick.correct.is_some()));
        let alice = picks
            .iter()
            .flatten()
            .find(|pick| pick.participant_id == players[0].id)
            .expect("alice pick");
        assert_eq!(alice.correct, Some(false));
    }

    #[tokio::test]
    async fn completed_game_still_resolves_late_picks() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(2, 1), &["alice", "bob"]).await;
        harness.schedule("thu-a", 1, "DEN", "KC", 1).await;
        harness.schedule("thu-b", 1, "MIA", "BUF", 1).await;
        harness.schedule("sun", 1, "NYJ", "NE", 4).await;
        pick(&harness, game.id, "alice", 1, "KC", "thu-a", 1).await;
        pick(&harness, game.id, "alice", 1, "BUF", "thu-b", 2).await;
        pick(&harness, game.id, "bob", 1, "DEN", "thu-a", 1).await;
        pick(&harness, game.id, "bob", 1, "NE", "sun", 2).await;
        harness.clock.advance(2 * DAY);
        harness.finish("thu-a", 10, 24).await;
        harness.finish("thu-b", 0, 14).await;

        let thursday = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(thursday.participants_eliminated, vec![players[1].id]);
        assert!(thursday.game_completed);
        assert_eq!(thursday.winner, Some(players[0].id));

        harness.clock.advance(3 * DAY);
        harness.finish("sun", 7, 21).await;
        let sunday = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(sunday.picks_resolved, 1);
        assert!(sunday.game_completed);
        assert_eq!(sunday.winner, Some(players[0].id));

        let (_, picks, _) = harness.snapshot(game.id).await;
        assert!(picks.iter().flatten().all(|pick| pick.correct.is_some()));
        let again = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(again.picks_resolved, 0);
    }

    #[tokio::test]
    async fn two_pick_week_requires_both_slots() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(2, 2), &["alice", "bob"]).await;
        harness.schedule("a", 2, "DEN", "KC", 1).await;
        harness.schedule("b", 2, "MIA", "BUF", 1).await;
        pick(&harness, game.id, "alice", 2, "KC", "a", 1).await;
        pick(&harness, game.id, "bob", 2, "KC", "a", 1).await;
        pick(&harness, game.id, "bob", 2, "BUF", "b", 2).await;
        harness.clock.advance(2 * DAY);
        harness.finish("a", 3, 30).await;
        harness.finish("b", 0, 14).await;

        let report = harness.core.results.process_week(game.id, 2).await.expect("processed");
        assert_eq!(report.participants_eliminated, vec![players[0].id]);
        assert_eq!(
            harness.participant(players[0].id).await.elimination_reason,
            Some(EliminationReason::MissingPick)
        );
        assert_eq!(report.winner, Some(players[1].id));
    }

    #[tokio::test]
    async fn unfinished_matchups_leave_participants_pending() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(2, 12), &["alice", "bob"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "DEN", "kc-den", 1).await;
        harness.clock.advance(2 * DAY);

        let report = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(report.picks_resolved, 0);
        assert_eq!(report.pending, vec![players[0].id, players[1].id]);
        assert!(!report.game_completed);
    }

    #[tokio::test]
    async fn corrupt_pick_is_reported_as_invariant_violation() {
        let harness = Harness::new();
        let (game, players) = harness.started_game(settings(3, 12), &["alice", "bob", "carol"]).await;
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        pick(&harness, game.id, "alice", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "bob", 1, "KC", "kc-den", 1).await;
        pick(&harness, game.id, "carol", 1, "KC", "kc-den", 1).await;
        harness.insert_raw_pick(&players[0], 1, 2, "DEN", "kc-den").await;
        harness.clock.advance(2 * DAY);
        harness.finish("kc-den", 20, 27).await;

        let report = harness.core.results.process_week(game.id, 1).await.expect("processed");
        assert_eq!(report.invariant_violations.len(), 1);
        assert_eq!(report.invariant_violations[0].participant_id, players[0].id);
        assert!(harness.participant(players[0].id).await.is_active());
    }

    #[tokio::test]
    async fn last_week_with_several_survivors_closes_the_season() {
        let harness = Harness::new();
        let mut config = settings(2, 3);
        config.end_week = 3;
        let (game, _) = harness.started_game(config, &["alice", "bob"]).await;
        harness.schedule("a", 3, "DEN", "KC", 1).await;
        harness.schedule("b", 3, "MIA", "BUF", 1).await;
        pick(&harness, game.id, "alice", 3, "KC", "a", 1).await;
        pick(&harness, game.id, "alice", 3, "BUF", "b", 2).await;
        pick(&harness, game.id, "bob", 3, "BUF", "b", 1).await;
        pick(&harness, game.id, "bob", 3, "KC", "a", 2).await;
        harness.clock.advance(2 * DAY);
        harness.finish("a", 3, 30).await;
        harness.finish("b", 0, 14).await;

        let report = harness.core.results.process_week(game.id, 3).await.expect("processed");
        assert!(report.game_completed);
        assert_eq!(report.winner, None);
    }

    #[tokio::test]
    async fn processing_checks_status_and_bounds() {
        let harness = Harness::new();
        let lifecycle = &harness.core.lifecycle;
        let open = lifecycle.create_game(settings(2, 12)).await.expect("game");
        lifecycle.join_game(open.id, "alice").await.expect("join");
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;

        let err = harness.core.results.process_week(open.id, 40).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::WeekOutOfRange)));

        harness.core.results.process_week(open.id, 1).await.expect("processed");
        assert_eq!(
            lifecycle.get_game(open.id).await.expect("game").status,
            GameStatus::Active
        );

        let cancelled = lifecycle.create_game(settings(2, 12)).await.expect("game");
        lifecycle.cancel_game(cancelled.id).await.expect("cancel");
        let err = harness.core.results.process_week(cancelled.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rule(RuleViolation::GameNotActive)));
    }
}
