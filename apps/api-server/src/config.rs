//! Application configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use hivemind_infra::database::DatabaseConfig;

/// Which storage engine backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "postgres" => Ok(StorageKind::Postgres),
            _ => Err(ConfigError::UnknownStorage(s.to_string())),
        }
    }
}

/// Configuration errors - reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown storage type: {0}")]
    UnknownStorage(String),

    #[error("DATABASE_URL must be set when STORAGE_TYPE=postgres")]
    MissingDatabaseUrl,

    #[error("invalid PORT: {0}")]
    InvalidPort(String),

    #[error("invalid {key}: {value}")]
    InvalidPoolSize { key: &'static str, value: String },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage = match lookup("STORAGE_TYPE") {
            Some(kind) => kind.parse()?,
            None => StorageKind::Memory,
        };

        let pool_size = |key: &'static str, default: u32| match lookup(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPoolSize { key, value }),
            None => Ok(default),
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: pool_size("DB_MAX_CONNECTIONS", 100)?,
                min_connections: pool_size("DB_MIN_CONNECTIONS", 10)?,
            }),
            None => None,
        };
        if storage == StorageKind::Postgres && database.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let port = match lookup("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => 8080,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            storage,
            database,
        })
    }
}
