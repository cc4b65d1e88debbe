//! Connection settings for the MongoDB survivor store.

use std::env;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "survivor_pool";
const APP_NAME: &str = "survivor-pool-back";

/// Parsed client options plus the database holding the pool collections.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding `games`, `participants`, `picks` and `matchups`.
    pub database_name: String,
}

impl MongoConfig {
    /// Settings from `MONGO_URI` and the optional `MONGO_DB`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let database = env::var("MONGO_DB")
            .ok()
            .filter(|name| !name.trim().is_empty());
        Self::parse(&uri, database).await
    }

    /// `database` wins over the one named in the URI path, which wins over `survivor_pool`.
    pub async fn parse(uri: &str, database: Option<String>) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
        let database_name = database
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        Ok(Self {
            options,
            database_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_name_precedence() {
        let plain = MongoConfig::parse("mongodb://localhost:27017", None)
            .await
            .expect("uri parses");
        assert_eq!(plain.database_name, DEFAULT_DATABASE);
        assert_eq!(plain.options.app_name.as_deref(), Some(APP_NAME));

        let from_path = MongoConfig::parse("mongodb://localhost:27017/league", None)
            .await
            .expect("uri parses");
        assert_eq!(from_path.database_name, "league");

        let explicit = MongoConfig::parse("mongodb://localhost:27017/league", Some("office".into()))
            .await
            .expect("uri parses");
        assert_eq!(explicit.database_name, "office");
    }

    #[tokio::test]
    async fn malformed_uri_is_rejected() {
        let err = MongoConfig::parse("postgres://nope", None).await.err();
        assert!(matches!(err, Some(MongoDaoError::InvalidUri { .. })));
    }
}
