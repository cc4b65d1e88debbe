use std::time::Duration;

use futures::future::BoxFuture;

use super::{FeedError, ScoreFeed, parse_week};
use crate::dao::models::MatchupEntity;

/// JSON score provider reached at `{base_url}/seasons/{season}/weeks/{week}`.
#[derive(Clone)]
pub struct HttpScoreFeed {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpScoreFeed {
    /// Client for `{base_url}/seasons/{season}/weeks/{week}`.
    pub fn new(name: String, base_url: String, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn week_url(&self, season: u16, week: u32) -> String {
        format!("{}/seasons/{season}/weeks/{week}", self.base_url)
    }

    async fn fetch(&self, season: u16, week: u32) -> Result<Vec<MatchupEntity>, FeedError> {
        let response = self.client.get(self.week_url(season, week)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }
        let body = response.bytes().await?;
        parse_week(&self.name, &body, season, week)
    }
}

impl ScoreFeed for HttpScoreFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_week(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, Result<Vec<MatchupEntity>, FeedError>> {
        let feed = self.clone();
        Box::pin(async move { feed.fetch(season, week).await })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{Router, extract::Path, http::StatusCode, routing::get};

    use super::*;

    async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });
        (base_url, handle)
    }

    #[tokio::test]
    async fn fetches_the_requested_week() {
        let router = Router::new().route(
            "/seasons/{season}/weeks/{week}",
            get(|Path((season, week)): Path<(u16, u32)>| async move {
                format!(
                    r#"[{{"id": "g1", "week": {week}, "season": {season}, "homeTeam": "PHI",
                        "awayTeam": "GB", "homeScore": 34, "awayScore": 29, "complete": true,
                        "scheduledStart": "2024-09-06T20:15:00-03:00"}}]"#
                )
            }),
        );
        let (base_url, handle) = serve_router(router).await;

        let feed = HttpScoreFeed::new("primary".into(), format!("{base_url}/"), Duration::from_secs(5))
            .expect("client builds");
        let matchups = feed.fetch_week(2024, 1).await.expect("week fetched");

        assert_eq!(matchups.len(), 1);
        assert_eq!(matchups[0].home_team, "PHI");
        handle.abort();
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = Router::new().route(
            "/seasons/{season}/weeks/{week}",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let (base_url, handle) = serve_router(router).await;

        let feed = HttpScoreFeed::new("primary".into(), base_url, Duration::from_secs(5))
            .expect("client builds");
        let err = feed.fetch_week(2024, 1).await.unwrap_err();

        assert!(matches!(err, FeedError::Status(status) if status == StatusCode::SERVICE_UNAVAILABLE));
        handle.abort();
    }
}
