/// OpenAPI documentation generation.
pub mod documentation;
/// Participant elimination with optimistic concurrency.
pub mod elimination;
/// Health check service.
pub mod health_service;
/// Game creation, joins, start, cancellation and completion.
pub mod lifecycle;
/// Fire-and-forget notifications for eliminations and completed games.
pub mod notifications;
/// Pick submission rules.
pub mod pick_validator;
/// Weekly resolution of picks into eliminations.
pub mod result_processor;
/// Matchup outcome resolution.
pub mod result_resolver;
/// Background score import and week processing.
pub mod result_scheduler;
/// Retry-on-conflict policy with backoff.
pub mod retry;
/// Score providers.
pub mod score_feed;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Engine facade wiring every component to one store.
pub mod survivor_core;
/// Per-participant team usage.
pub mod team_ledger;

#[cfg(test)]
pub(crate) mod test_support;
