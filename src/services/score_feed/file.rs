use std::path::PathBuf;

use futures::future::BoxFuture;

use super::{FeedError, ScoreFeed, parse_week};
use crate::dao::models::MatchupEntity;

/// Static JSON fixture holding records of any number of weeks.
#[derive(Clone)]
pub struct FileScoreFeed {
    name: String,
    path: PathBuf,
}

impl FileScoreFeed {
    /// Feed reading `path` on every fetch.
    pub fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }
}

impl ScoreFeed for FileScoreFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_week(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>> {
        let feed = self.clone();
        Box::pin(async move {
            let payload = tokio::fs::read(&feed.path)
                .await
                .map_err(|source| FeedError::Io {
                    path: feed.path.clone(),
                    source,
                })?;
            parse_week(&feed.name, &payload, season, week)
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn reads_only_the_requested_week_from_the_fixture() {
        let path = std::env::temp_dir().join(format!("scores-{}.json", Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"[
                {"id": "a", "week": 3, "season": 2024, "homeTeam": "NYJ", "awayTeam": "NE",
                 "scheduledStart": "2024-09-19T20:15:00-04:00"},
                {"id": "b", "week": 4, "season": 2024, "homeTeam": "NYG", "awayTeam": "DAL",
                 "scheduledStart": "2024-09-26T20:15:00-04:00"}
            ]"#,
        )
        .await
        .expect("fixture written");

        let feed = FileScoreFeed::new("fixture".into(), path.clone());
        let matchups = feed.fetch_week(2024, 3).await.expect("fixture read");
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(matchups.len(), 1);
        assert_eq!(matchups[0].id, "a");
        assert!(!matchups[0].complete);
    }

    #[tokio::test]
    async fn missing_fixture_is_an_io_error() {
        let feed = FileScoreFeed::new("fixture".into(), PathBuf::from("/nonexistent/scores.json"));
        assert!(matches!(
            feed.fetch_week(2024, 1).await,
            Err(FeedError::Io { .. })
        ));
    }
}
