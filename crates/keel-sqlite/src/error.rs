//! Error types for the SQLite collaborator.

use keel_core::error::{Diagnostics, SurfaceError};
use keel_core::row::RowError;

/// Errors that can occur while opening, migrating or querying a database.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Database error outside of a migration statement.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration statement failed; the migration was rolled back.
    #[error("Statement failed: {source}\n  sql: {sql}")]
    Statement {
        /// The failing statement.
        sql: String,
        /// Engine error.
        #[source]
        source: sqlx::Error,
    },

    /// The schema did not validate.
    #[error("{0}")]
    Schema(#[from] Diagnostics),

    /// A result row did not materialize into its model.
    #[error("Row error: {0}")]
    Row(#[from] RowError),

    /// A builder could not address a row.
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Invalid configuration value.
    #[error("Invalid configuration `{key}`: {message}")]
    Configuration {
        /// Offending key.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
