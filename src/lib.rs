//! Library crate for survivor-pool-back, exposing modules for binaries and integration tests.

/// JSON application configuration.
pub mod config;
/// Entities, the storage trait and its backends.
pub mod dao;
mod dto;
/// Rule violations and the service and HTTP error layers.
pub mod error;
/// HTTP surface.
pub mod routes;
/// Pool engine, background tasks and their collaborators.
pub mod services;
/// Shared application state.
pub mod state;
