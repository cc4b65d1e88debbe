/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Survivor pool persistence and retrieval operations.
pub mod survivor_store;
