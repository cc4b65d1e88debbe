mod config;
mod connection;
mod error;
mod models;
/// Collection access and the [`SurvivorStore`](crate::dao::survivor_store::SurvivorStore) impl.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSurvivorStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
