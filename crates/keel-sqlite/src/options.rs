//! Database configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{MigrationError, Result};

/// Environment variable read by [`DatabaseOptions::from_env`].
pub const DATABASE_URL_ENV: &str = "KEEL_DATABASE_URL";
/// Environment variable for the pool size.
pub const MAX_CONNECTIONS_ENV: &str = "KEEL_MAX_CONNECTIONS";

/// How to reach and prepare a database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseOptions {
    /// SQLite connection URL, e.g. `sqlite://app.db` or `sqlite::memory:`.
    pub url: String,
    /// Pool size. In-memory databases should keep a single connection.
    pub max_connections: u32,
    /// Enforce foreign keys on every connection.
    pub foreign_keys: bool,
    /// Create the database file when missing.
    pub create_if_missing: bool,
    /// Log migration statements instead of executing them.
    pub dry_run: bool,
    /// How long to wait for a pooled connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            foreign_keys: true,
            create_if_missing: true,
            dry_run: false,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseOptions {
    /// Creates options for `url` with every other setting at its default.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Reads `KEEL_DATABASE_URL` and `KEEL_MAX_CONNECTIONS`.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Configuration`] when the pool size is not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            options.url = url;
        }
        if let Ok(raw) = std::env::var(MAX_CONNECTIONS_ENV) {
            options.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| MigrationError::Configuration {
                    key: MAX_CONNECTIONS_ENV.to_string(),
                    message: format!("expected a positive integer, got \"{raw}\""),
                })?;
        }
        Ok(options)
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Enables or disables foreign-key enforcement.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Enables or disables creating a missing database file.
    #[must_use]
    pub const fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Sets the pool acquire timeout.
    #[must_use]
    pub const fn acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = secs;
        self
    }

    /// Whether the URL names an in-memory database.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Opens a connection pool.
    ///
    /// In-memory pools never retire their connections, since the database
    /// lives only as long as the connection does.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Configuration`] for a zero pool size, or the
    /// `sqlx` error for a malformed URL or a failed connection.
    pub async fn connect(&self) -> Result<SqlitePool> {
        if self.max_connections == 0 {
            return Err(MigrationError::Configuration {
                key: "max_connections".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let connect_options = SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(self.create_if_missing)
            .foreign_keys(self.foreign_keys);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs));
        if self.is_memory() {
            pool_options = pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        Ok(pool_options.connect_with(connect_options).await?)
    }
}
