//! Pluggable sources of matchup results.

mod file;
mod http;

use std::{path::PathBuf, sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use crate::{config::ScoreFeedConfig, dao::models::MatchupEntity, services::pick_validator::normalize_team};

pub use self::{file::FileScoreFeed, http::HttpScoreFeed};

/// Failures of a score feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure.
    #[error("score feed request failed")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status.
    #[error("score feed answered with status {0}")]
    Status(reqwest::StatusCode),
    /// The fixture file could not be read.
    #[error("failed to read score fixture `{path}`")]
    Io {
        /// Fixture path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The body is not a JSON array of records.
    #[error("score feed payload is not a JSON array")]
    Payload(#[source] serde_json::Error),
    /// Every provider failed for the week.
    #[error("no score feed could supply season {season} week {week}")]
    Exhausted {
        /// Requested season.
        season: u16,
        /// Requested week.
        week: u32,
    },
}

/// Source of the matchups of one season week.
pub trait ScoreFeed: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;
    /// Matchups of a season week; empty when the provider has none yet.
    fn fetch_week(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>>;
}

/// Wire representation of a feed record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedRecord {
    id: String,
    week: u32,
    season: u16,
    home_team: String,
    away_team: String,
    home_score: Option<u32>,
    away_score: Option<u32>,
    #[serde(default)]
    complete: bool,
    scheduled_start: String,
}

impl FeedRecord {
    fn into_matchup(self) -> Result<MatchupEntity, String> {
        if self.id.trim().is_empty() {
            return Err("empty id".into());
        }
        if self.week == 0 {
            return Err("week must be at least 1".into());
        }
        let home_team = normalize_team(&self.home_team);
        let away_team = normalize_team(&self.away_team);
        if home_team.is_empty() || away_team.is_empty() || home_team == away_team {
            return Err(format!("invalid teams `{home_team}` / `{away_team}`"));
        }
        if self.complete && (self.home_score.is_none() || self.away_score.is_none()) {
            return Err("complete without final score".into());
        }
        let scheduled_start = OffsetDateTime::parse(&self.scheduled_start, &Rfc3339)
            .map(SystemTime::from)
            .map_err(|err| format!("bad scheduledStart `{}`: {err}", self.scheduled_start))?;

        Ok(MatchupEntity {
            id: self.id.trim().to_owned(),
            season: self.season,
            week: self.week,
            home_team,
            away_team,
            home_score: self.home_score,
            away_score: self.away_score,
            complete: self.complete,
            scheduled_start,
        })
    }
}

/// Decode a feed payload, keeping the well-formed records of (`season`, `week`).
fn parse_week(
    feed: &str,
    payload: &[u8],
    season: u16,
    week: u32,
) -> Result<Vec<MatchupEntity>, FeedError> {
    let records: Vec<serde_json::Value> =
        serde_json::from_slice(payload).map_err(FeedError::Payload)?;

    let mut matchups = Vec::with_capacity(records.len());
    for raw in records {
        let record = match serde_json::from_value::<FeedRecord>(raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(feed, error = %err, "skipping malformed score record");
                continue;
            }
        };
        if record.season != season || record.week != week {
            continue;
        }
        let id = record.id.clone();
        match record.into_matchup() {
            Ok(matchup) => matchups.push(matchup),
            Err(reason) => warn!(feed, matchup_id = %id, %reason, "skipping invalid score record"),
        }
    }
    Ok(matchups)
}

/// Ordered fallback over several feeds: the first one with data for the week wins.
pub struct PrioritizedScoreFeed {
    feeds: Vec<Arc<dyn ScoreFeed>>,
}

impl PrioritizedScoreFeed {
    /// Feeds in priority order.
    pub fn new(feeds: Vec<Arc<dyn ScoreFeed>>) -> Self {
        Self { feeds }
    }

    /// Build the provider chain described by the configuration; `None` when it lists no feed.
    pub fn from_config(configs: &[ScoreFeedConfig]) -> Result<Option<Self>, FeedError> {
        if configs.is_empty() {
            return Ok(None);
        }
        let mut feeds: Vec<Arc<dyn ScoreFeed>> = Vec::with_capacity(configs.len());
        for config in configs {
            match config {
                ScoreFeedConfig::Http {
                    name,
                    base_url,
                    timeout_secs,
                } => feeds.push(Arc::new(HttpScoreFeed::new(
                    name.clone(),
                    base_url.clone(),
                    std::time::Duration::from_secs(*timeout_secs),
                )?)),
                ScoreFeedConfig::File { name, path } => {
                    feeds.push(Arc::new(FileScoreFeed::new(name.clone(), path.clone())))
                }
            }
        }
        Ok(Some(Self::new(feeds)))
    }
}

impl ScoreFeed for PrioritizedScoreFeed {
    fn name(&self) -> &str {
        "prioritized"
    }

    fn fetch_week(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>> {
        let feeds = self.feeds.clone();
        Box::pin(async move {
            let mut answered = false;
            for feed in feeds {
                match feed.fetch_week(season, week).await {
                    Ok(matchups) if !matchups.is_empty() => {
                        debug!(feed = feed.name(), season, week, count = matchups.len(), "score feed answered");
                        return Ok(matchups);
                    }
                    Ok(_) => {
                        debug!(feed = feed.name(), season, week, "score feed has no matchups");
                        answered = true;
                    }
                    Err(err) => {
                        warn!(feed = feed.name(), season, week, error = %err, "score feed failed; trying next");
                    }
                }
            }
            if answered {
                Ok(Vec::new())
            } else {
                Err(FeedError::Exhausted { season, week })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFeed {
        name: &'static str,
        result: fn() -> Result<Vec<MatchupEntity>, FeedError>,
    }

    impl ScoreFeed for StaticFeed {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch_week(
            &self,
            _season: u16,
            _week: u32,
        ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>> {
            let result = (self.result)();
            Box::pin(async move { result })
        }
    }

    fn one_matchup() -> Result<Vec<MatchupEntity>, FeedError> {
        parse_week("static", SAMPLE.as_bytes(), 2024, 1)
    }

    fn failing() -> Result<Vec<MatchupEntity>, FeedError> {
        Err(FeedError::Status(reqwest::StatusCode::BAD_GATEWAY))
    }

    const SAMPLE: &str = r#"[
        {"id": "kc-den", "week": 1, "season": 2024, "homeTeam": "den", "awayTeam": "KC",
         "homeScore": 20, "awayScore": 27, "complete": true,
         "scheduledStart": "2024-09-05T20:20:00-04:00"},
        {"id": "late", "week": 2, "season": 2024, "homeTeam": "BUF", "awayTeam": "MIA",
         "scheduledStart": "2024-09-12T20:15:00Z"},
        {"id": "broken", "week": 1, "season": 2024, "homeTeam": "LV", "awayTeam": "LAC",
         "complete": true, "scheduledStart": "2024-09-08T16:25:00Z"},
        {"id": 7, "week": "one"}
    ]"#;

    #[test]
    fn parse_week_keeps_valid_records_of_the_week() {
        let matchups = parse_week("test", SAMPLE.as_bytes(), 2024, 1).expect("payload parses");

        assert_eq!(matchups.len(), 1);
        let matchup = &matchups[0];
        assert_eq!(matchup.home_team, "DEN");
        assert_eq!(matchup.away_team, "KC");
        assert!(matchup.complete);
        assert_eq!(
            matchup.scheduled_start,
            SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_725_582_000)
        );
    }

    #[test]
    fn non_array_payload_is_rejected() {
        assert!(matches!(
            parse_week("test", b"{\"games\": []}", 2024, 1),
            Err(FeedError::Payload(_))
        ));
    }

    #[tokio::test]
    async fn prioritized_feed_falls_back_on_failure() {
        let feed = PrioritizedScoreFeed::new(vec![
            Arc::new(StaticFeed {
                name: "down",
                result: failing,
            }),
            Arc::new(StaticFeed {
                name: "backup",
                result: one_matchup,
            }),
        ]);

        let matchups = feed.fetch_week(2024, 1).await.expect("backup answers");
        assert_eq!(matchups.len(), 1);
    }

    #[tokio::test]
    async fn prioritized_feed_reports_exhaustion() {
        let feed = PrioritizedScoreFeed::new(vec![Arc::new(StaticFeed {
            name: "down",
            result: failing,
        })]);

        assert!(matches!(
            feed.fetch_week(2024, 1).await,
            Err(FeedError::Exhausted { season: 2024, week: 1 })
        ));
    }
}
