//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use league_pairings::db::DatabaseConfig;
use league_pairings::pairing::manager::DEFAULT_MAX_TEAMS;
use std::net::{Ipv4Addr, SocketAddr};

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
    6970,
);

/// Largest team count the bracket stages can hold
const BRACKET_CAPACITY: usize = 64;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` runs on the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Upper bound on `teamCount` for generator requests
    pub max_teams: usize,
    /// Prometheus scrape listener, disabled when absent
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is present but unparsable
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_opt("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let database = match database_url_override {
            Some(url) => Some(DatabaseConfig::with_url(url)),
            None => DatabaseConfig::from_env(),
        };

        let max_teams = parse_env_opt("MAX_TEAMS_PER_DIVISION")?.unwrap_or(DEFAULT_MAX_TEAMS);
        let metrics_bind = parse_env_opt("METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            database,
            max_teams,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_teams < 2 {
            return Err(ConfigError::Invalid {
                var: "MAX_TEAMS_PER_DIVISION".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.max_teams > BRACKET_CAPACITY {
            return Err(ConfigError::Invalid {
                var: "MAX_TEAMS_PER_DIVISION".to_string(),
                reason: format!("Must be at most {BRACKET_CAPACITY} (largest bracket stage)"),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        if let Some(database) = &self.database {
            if database.database_url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    var: "DATABASE_URL".to_string(),
                    reason: "Must not be empty".to_string(),
                });
            }
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed DB_MAX_CONNECTIONS ({})",
                        database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional environment variable, rejecting values that do not parse
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}
