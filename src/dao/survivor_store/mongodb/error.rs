use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB backend operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB backend. Converted into [`StorageError::Unavailable`] at the trait
/// boundary.
///
/// [`StorageError::Unavailable`]: crate::dao::storage::StorageError::Unavailable
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required variable is unset.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The connection string did not parse.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Every ping of the connection budget failed.
    #[error("MongoDB did not answer ping after {attempts} attempt(s)")]
    PingExhausted {
        /// Pings sent.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A health probe ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Insert or replace of a game failed.
    #[error("failed to save game `{id}`")]
    SaveGame {
        /// Document key.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Lookup of a game failed.
    #[error("failed to load game `{id}`")]
    LoadGame {
        /// Document key.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Listing games failed.
    #[error("failed to list games")]
    ListGames {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Insert or replace of a participant failed.
    #[error("failed to save participant `{id}`")]
    SaveParticipant {
        /// Document key.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Query over participants failed.
    #[error("failed to load participants for `{key}`")]
    LoadParticipants {
        /// Filter the query ran with.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upsert of a pick failed.
    #[error("failed to save pick for participant `{participant_id}`")]
    SavePick {
        /// Owner of the pick.
        participant_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Query over picks failed.
    #[error("failed to load picks for `{key}`")]
    LoadPicks {
        /// Filter the query ran with.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The resolve-once write failed.
    #[error("failed to resolve pick `{id}`")]
    ResolvePick {
        /// Document key.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upsert of a matchup failed.
    #[error("failed to save matchup `{id}`")]
    SaveMatchup {
        /// Document key.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Query over matchups failed.
    #[error("failed to load matchups for `{key}`")]
    LoadMatchups {
        /// Filter the query ran with.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A stored document does not map back to an entity.
    #[error("stored {collection} document `{id}` is corrupt: {detail}")]
    CorruptDocument {
        /// Collection name.
        collection: &'static str,
        /// Document key.
        id: String,
        /// What failed to convert.
        detail: String,
    },
}
