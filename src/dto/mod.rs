use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Game creation, admission and standings payloads.
pub mod game;
pub mod health;
/// Pick submission and team usage payloads.
pub mod pick;
/// Matchup ingest and week processing payloads.
pub mod results;
/// Events pushed on the public stream.
pub mod sse;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
