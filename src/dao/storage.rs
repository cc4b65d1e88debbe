use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Operation that failed.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A compare-and-swap write lost against a concurrent writer.
    #[error("concurrent update detected on {entity} `{id}`")]
    Conflict {
        /// Kind of record, e.g. `game`.
        entity: &'static str,
        /// Key of the record.
        id: String,
    },
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {entity} for key `{key}`")]
    Duplicate {
        /// Kind of record, e.g. `pick`.
        entity: &'static str,
        /// Unique key that already exists.
        key: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Lost compare-and-swap on `entity` `id`.
    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        StorageError::Conflict {
            entity,
            id: id.to_string(),
        }
    }

    /// Unique `key` already taken for `entity`.
    pub fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        StorageError::Duplicate {
            entity,
            key: key.into(),
        }
    }
}
