//! Application-level configuration loading: tie policy default, retry budget, result sync and
//! score feed providers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::TiePolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SURVIVOR_POOL_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Tie policy applied to games created without an explicit one.
    pub default_tie_policy: TiePolicy,
    /// Budget for compare-and-swap retries.
    pub conflict_retry: ConflictRetryConfig,
    /// Background result synchronisation.
    pub result_sync: ResultSyncConfig,
    /// Score providers, highest priority first.
    pub score_feeds: Vec<ScoreFeedConfig>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        feeds = app_config.score_feeds.len(),
                        tie_policy = ?app_config.default_tie_policy,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_tie_policy: TiePolicy::Eliminate,
            conflict_retry: ConflictRetryConfig::default(),
            result_sync: ResultSyncConfig::default(),
            score_feeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Exponential backoff used when a compare-and-swap write loses a race.
pub struct ConflictRetryConfig {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay.
    pub max_delay_ms: u64,
}

impl Default for ConflictRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Periodic score import and week processing.
pub struct ResultSyncConfig {
    /// Run the background sync task.
    pub enabled: bool,
    /// Pause between two sync passes, at least one second.
    pub interval_secs: u64,
}

impl ResultSyncConfig {
    /// Pause between two sync passes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for ResultSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// One score provider entry.
pub enum ScoreFeedConfig {
    /// JSON over HTTP at `{base_url}/seasons/{season}/weeks/{week}`.
    Http {
        /// Label used in logs.
        name: String,
        /// Root URL of the provider.
        base_url: String,
        /// Request timeout, 10 seconds by default.
        #[serde(default = "default_feed_timeout_secs")]
        timeout_secs: u64,
    },
    /// Static JSON fixture on disk.
    File {
        /// Label used in logs.
        name: String,
        /// Fixture path, read on every fetch.
        path: PathBuf,
    },
}

fn default_feed_timeout_secs() -> u64 {
    10
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "default_tie_policy": "survive",
                "score_feeds": [
                    {"kind": "http", "name": "primary", "base_url": "http://scores.local"},
                    {"kind": "file", "name": "fixture", "path": "fixtures/week.json"}
                ]
            }"#,
        )
        .expect("config parses");

        assert_eq!(config.default_tie_policy, TiePolicy::Survive);
        assert_eq!(config.conflict_retry.max_attempts, 5);
        assert!(!config.result_sync.enabled);
        assert_eq!(
            config.score_feeds[0],
            ScoreFeedConfig::Http {
                name: "primary".into(),
                base_url: "http://scores.local".into(),
                timeout_secs: 10,
            }
        );
        assert!(matches!(config.score_feeds[1], ScoreFeedConfig::File { .. }));
    }
}
