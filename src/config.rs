//! Service configuration read from the environment.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::provider::StoreTarget;

/// Runtime settings for the tracker service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    /// Route dataset to load instead of the built-in one.
    pub routes_path: Option<PathBuf>,
    pub store_uri: String,
    pub db_name: String,
    pub collection_name: String,
    pub topic_prefix: String,

    /// `None` when `CONNECTOR_URL` is unset and registration is skipped.
    pub connector: Option<ConnectorConfig>,

    /// Pause after each store write during a delivery run.
    pub pacing: Duration,
}

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub url: String,
    pub config_path: PathBuf,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let connector = env::var("CONNECTOR_URL").ok().filter(|url| !url.trim().is_empty()).map(
            |url| ConnectorConfig {
                url,
                config_path: PathBuf::from(env_string(
                    "CONNECTOR_CONFIG_PATH",
                    "./config/mongo-connector.json",
                )),
                max_attempts: env_parse("CONNECTOR_MAX_ATTEMPTS", 10),
                retry_delay: Duration::from_millis(env_parse("CONNECTOR_RETRY_DELAY_MS", 4_000)),
            },
        );

        Self {
            port: env_parse("PORT", 3000),
            routes_path: env::var("ROUTES_PATH").ok().map(PathBuf::from),
            store_uri: env_string("STORE_URI", "memory://local"),
            db_name: env_string("DB_NAME", "delivery"),
            collection_name: env_string("COLLECTION_NAME", "drivers"),
            topic_prefix: env_string("TOPIC_PREFIX", "dbserver1"),
            connector,
            pacing: Duration::from_millis(env_parse("RUN_PACING_MS", 0)),
        }
    }

    #[must_use]
    pub fn store_target(&self) -> StoreTarget {
        StoreTarget {
            db: self.db_name.clone(),
            collection: self.collection_name.clone(),
            topic_prefix: self.topic_prefix.clone(),
        }
    }

    /// Change-capture topic for the position collection.
    #[must_use]
    pub fn topic(&self) -> String {
        self.store_target().topic()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::trace!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn env_parse<T: FromStr + Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{key} has invalid value {value:?}, using default: {default}");
            default
        }),
        Err(_) => {
            tracing::trace!("{key} not set, using default: {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn topic_name() {
        let mut config = Config::from_env();
        config.topic_prefix = "dbserver1".to_string();
        config.db_name = "delivery".to_string();
        config.collection_name = "drivers".to_string();
        assert_eq!(config.topic(), "dbserver1.delivery.drivers");
    }
}
