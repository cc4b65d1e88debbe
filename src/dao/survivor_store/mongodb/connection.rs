use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, info};

use super::error::{MongoDaoError, MongoResult};

const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// How many pings a connection attempt may spend before giving up.
#[derive(Debug, Clone, Copy)]
pub enum PingBudget {
    /// Startup: the server may still be booting.
    Startup,
    /// Reconnect after a failed health check; the supervisor backs off between calls.
    Reconnect,
}

impl PingBudget {
    fn attempts(self) -> u32 {
        match self {
            PingBudget::Startup => 10,
            PingBudget::Reconnect => 2,
        }
    }
}

/// Build a client for `database_name` and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
    budget: PingBudget,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let max_attempts = budget.attempts();
    let mut delay = FIRST_PING_DELAY;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = database_name, attempts, ?budget, "MongoDB answered ping");
                return Ok((client, database));
            }
            Err(source) if attempts >= max_attempts => {
                return Err(MongoDaoError::PingExhausted { attempts, source });
            }
            Err(err) => {
                debug!(database = database_name, attempts, error = %err, "MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_PING_DELAY);
            }
        }
    }
}
