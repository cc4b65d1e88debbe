use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::models::{GameEntity, GameStatus},
    error::ServiceError,
    services::{result_processor::week_is_locked, score_feed::ScoreFeed, survivor_core::SurvivorCore},
    state::{SharedState, clock::Clock},
};

/// Periodically import scores and process every running game.
pub async fn run(state: SharedState, feed: Arc<dyn ScoreFeed>, interval: Duration) {
    loop {
        match state.core().await {
            Ok(core) => {
                if let Err(err) = sync_once(&core, feed.as_ref(), state.clock().as_ref()).await {
                    warn!(error = %err, "result sync pass failed");
                }
            }
            Err(_) => debug!("storage unavailable; skipping result sync"),
        }
        sleep(interval).await;
    }
}

/// One sync pass: import unsettled weeks of every season with running games, then process them.
pub async fn sync_once(
    core: &SurvivorCore,
    feed: &dyn ScoreFeed,
    clock: &dyn Clock,
) -> Result<(), ServiceError> {
    let games: Vec<GameEntity> = core
        .list_games()
        .await?
        .into_iter()
        .filter(|game| matches!(game.status, GameStatus::Open | GameStatus::Active))
        .collect();

    let mut seasons: BTreeMap<u16, (u32, u32)> = BTreeMap::new();
    for game in &games {
        let bounds = seasons
            .entry(game.season)
            .or_insert((game.start_week, game.end_week));
        bounds.0 = bounds.0.min(game.start_week);
        bounds.1 = bounds.1.max(game.end_week);
    }

    let mut synced: BTreeMap<u16, BTreeSet<u32>> = BTreeMap::new();
    for (season, (first, last)) in seasons {
        let weeks = sync_season(core, feed, clock, season, first, last).await;
        synced.insert(season, weeks);
    }

    for game in games {
        let Some(weeks) = synced.get(&game.season) else {
            continue;
        };
        for &week in weeks.iter().filter(|week| game.covers_week(**week)) {
            match core.process_week(game.id, week).await {
                Ok(report) if report.game_completed => {
                    info!(game_id = %game.id, week, winner = ?report.winner, "game completed by result sync");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(game_id = %game.id, week, error = %err, "week processing failed");
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Import weeks `first..=last` until the first week that has not started. Returns the weeks
/// with started matchups.
async fn sync_season(
    core: &SurvivorCore,
    feed: &dyn ScoreFeed,
    clock: &dyn Clock,
    season: u16,
    first: u32,
    last: u32,
) -> BTreeSet<u32> {
    let now = clock.now();
    let mut weeks = BTreeSet::new();

    for week in first..=last {
        let stored = match core.list_matchups(season, week).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(season, week, error = %err, "failed to read stored matchups");
                break;
            }
        };
        let settled = !stored.is_empty() && stored.iter().all(|matchup| matchup.complete);
        let matchups = if settled {
            stored
        } else {
            match feed.fetch_week(season, week).await {
                Ok(fetched) if fetched.is_empty() => stored,
                Ok(fetched) => {
                    if let Err(err) = core.save_matchups(fetched.clone()).await {
                        warn!(season, week, error = %err, "failed to save fetched matchups");
                        break;
                    }
                    debug!(season, week, count = fetched.len(), feed = feed.name(), "matchups imported");
                    fetched
                }
                Err(err) => {
                    warn!(season, week, feed = feed.name(), error = %err, "score fetch failed");
                    stored
                }
            }
        };

        if !matchups.iter().any(|matchup| matchup.is_locked_at(now)) {
            break;
        }
        weeks.insert(week);
        if !week_is_locked(&matchups, now) {
            break;
        }
    }
    weeks
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::models::{MatchupEntity, ParticipantStatus},
        services::{
            pick_validator::PickSubmission,
            score_feed::FeedError,
            test_support::{Harness, SEASON, settings},
        },
    };

    const DAY: Duration = Duration::from_secs(86_400);

    /// Week 1 finished (KC beat DEN), week 2 scheduled in the future.
    struct SeasonFeed {
        week_one_start: SystemTime,
    }

    impl ScoreFeed for SeasonFeed {
        fn name(&self) -> &str {
            "season"
        }

        fn fetch_week(
            &self,
            season: u16,
            week: u32,
        ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>> {
            let start = self.week_one_start;
            Box::pin(async move {
                let matchup = match week {
                    1 => MatchupEntity {
                        id: "kc-den".into(),
                        season,
                        week,
                        home_team: "DEN".into(),
                        away_team: "KC".into(),
                        home_score: Some(20),
                        away_score: Some(27),
                        complete: true,
                        scheduled_start: start,
                    },
                    2 => MatchupEntity {
                        id: "buf-mia".into(),
                        season,
                        week,
                        home_team: "MIA".into(),
                        away_team: "BUF".into(),
                        home_score: None,
                        away_score: None,
                        complete: false,
                        scheduled_start: start + 30 * DAY,
                    },
                    _ => return Ok(Vec::new()),
                };
                Ok(vec![matchup])
            })
        }
    }

    #[tokio::test]
    async fn sync_imports_results_and_processes_the_week() {
        let harness = Harness::new();
        let (game, players) = harness
            .started_game(settings(3, 12), &["alice", "bob", "carol"])
            .await;
        let week_one_start = harness.clock.now() + DAY;
        let feed = SeasonFeed { week_one_start };

        // Picks are made before the feed reports anything.
        harness.schedule("kc-den", 1, "DEN", "KC", 1).await;
        for (player, team) in [("alice", "KC"), ("bob", "DEN"), ("carol", "KC")] {
            harness
                .core
                .submit_pick(PickSubmission {
                    game_id: game.id,
                    player_id: player.into(),
                    week: 1,
                    team_id: team.into(),
                    matchup_id: "kc-den".into(),
                    slot: 1,
                })
                .await
                .expect("pick accepted");
        }
        harness.clock.advance(3 * DAY);

        sync_once(&harness.core, &feed, harness.clock.as_ref())
            .await
            .expect("sync pass");

        let stored = harness.core.list_matchups(SEASON, 1).await.expect("matchups");
        assert!(stored[0].complete);
        assert!(harness.core.list_matchups(SEASON, 2).await.expect("matchups").len() == 1);
        assert_eq!(
            harness.participant(players[1].id).await.status,
            ParticipantStatus::Eliminated
        );
        assert!(harness.participant(players[0].id).await.is_active());
    }
}
