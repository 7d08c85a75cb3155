//! Server configuration

use crate::rate_limit::RateLimitConfig;
use crate::ApiError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Level, ApiError> {
        self.level
            .parse()
            .map_err(|_| ApiError::Config(format!("unknown log level {:?}", self.level)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// `memory` or a SQLite URL such as `sqlite://wellness.db`
    pub database_url: String,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5000".to_string(),
            database_url: "sqlite://wellness.db".to_string(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then an optional TOML file, then `WELLNESS_SERVER__*` variables
    pub fn load(path: Option<&str>) -> Result<Self, ApiError> {
        let defaults = Config::try_from(&ServerConfig::default())
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix("WELLNESS_SERVER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ApiError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.addr, "0.0.0.0:5000");
        assert_eq!(config.rate_limit.burst, 20);
        assert_eq!(config.logging.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_file_overrides() {
        let path = std::env::temp_dir().join(format!("wellness-server-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "addr = \"127.0.0.1:9999\"\ndatabase_url = \"memory\"\n[rate_limit]\nburst = 3\n",
        )
        .unwrap();

        let config = ServerConfig::load(path.to_str()).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9999");
        assert_eq!(config.database_url, "memory");
        assert_eq!(config.rate_limit.burst, 3);
        assert_eq!(config.rate_limit.replenish_secs, 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ServerConfig::load(Some("/no/such/wellness-server.toml")),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn test_bad_log_level() {
        let logging = LoggingConfig { level: "loud".into(), json: false };
        assert!(logging.level().is_err());
    }
}
