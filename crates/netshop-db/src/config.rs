//! Runtime configuration.
//!
//! Loaded from environment variables (after reading an optional `.env` file)
//! with fallback to defaults.
//!
//! | Variable             | Default              |
//! |----------------------|----------------------|
//! | `DATABASE_PATH`      | `./data/netshop.db`  |
//! | `DB_MAX_CONNECTIONS` | `5`                  |
//! | `ORDER_TIMEOUT_SECS` | `10` (`0` disables)  |
//! | `IMAGE_BASE_URL`     | `/static/files`      |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Netshop backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetshopConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Deadline for a single order transaction. `None` waits indefinitely.
    pub order_timeout: Option<Duration>,

    /// Public prefix joined with stored file paths.
    pub image_base_url: String,
}

impl NetshopConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections: u32 = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?;

        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        let order_timeout_secs: u64 = lookup("ORDER_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("ORDER_TIMEOUT_SECS".to_string()))?;

        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| "./data/netshop.db".to_string());
        if database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_PATH".to_string()));
        }

        Ok(NetshopConfig {
            database_path: PathBuf::from(database_path),
            max_connections,
            order_timeout: (order_timeout_secs > 0).then(|| Duration::from_secs(order_timeout_secs)),
            image_base_url: lookup("IMAGE_BASE_URL").unwrap_or_else(|| "/static/files".to_string()),
        })
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .order_timeout(self.order_timeout)
            .image_base_url(self.image_base_url.clone())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<NetshopConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NetshopConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./data/netshop.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.order_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.image_base_url, "/static/files");
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = load(&[("ORDER_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.order_timeout, None);
        assert_eq!(config.db_config().order_timeout, None);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            load(&[("DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".into()))
        );
        assert_eq!(
            load(&[("DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".into()))
        );
        assert_eq!(
            load(&[("ORDER_TIMEOUT_SECS", "-1")]),
            Err(ConfigError::InvalidValue("ORDER_TIMEOUT_SECS".into()))
        );
        assert_eq!(
            load(&[("DATABASE_PATH", " ")]),
            Err(ConfigError::MissingRequired("DATABASE_PATH".into()))
        );
    }

    #[test]
    fn test_overrides_reach_db_config() {
        let config = load(&[
            ("DATABASE_PATH", "/var/lib/netshop/shop.db"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("IMAGE_BASE_URL", "https://cdn.example.com"),
        ])
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/netshop/shop.db"));
        assert_eq!(db.max_connections, 12);
        assert_eq!(db.image_base_url, "https://cdn.example.com");
    }
}
