//! Persisted schema digest.
//!
//! This module manages the `keel_metadata` table, a small key/value table
//! holding the digest of the schema the database was last migrated to.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;

use crate::error::Result;

/// Name of the metadata table; never dropped by a migration.
pub const METADATA_TABLE: &str = "keel_metadata";

/// Key under which the schema digest is stored.
pub const DIGEST_KEY: &str = "schema_digest";

/// SQL to create the metadata table.
pub const CREATE_METADATA_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS keel_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// A digest read back from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDigest {
    /// The digest text.
    pub value: String,
    /// When it was written.
    pub updated_at: DateTime<Utc>,
}

/// Reads and writes the persisted digest.
///
/// Every method works on a plain connection so the write can share the
/// migration's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestStore;

impl DigestStore {
    /// Ensures the metadata table exists.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the statement.
    pub async fn ensure_table(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(CREATE_METADATA_TABLE_SQL).execute(&mut *conn).await?;
        Ok(())
    }

    /// Whether the metadata table exists. Read-only.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the lookup.
    pub async fn table_exists(conn: &mut SqliteConnection) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(METADATA_TABLE)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.is_some())
    }

    /// Loads the stored digest; `None` for a fresh database.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the lookup.
    pub async fn load(conn: &mut SqliteConnection) -> Result<Option<StoredDigest>> {
        if !Self::table_exists(conn).await? {
            return Ok(None);
        }
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT value, updated_at FROM keel_metadata WHERE key = ?")
                .bind(DIGEST_KEY)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(value, updated_at)| StoredDigest { value, updated_at }))
    }

    /// Stores `digest`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the write.
    pub async fn save(conn: &mut SqliteConnection, digest: &str) -> Result<()> {
        Self::ensure_table(conn).await?;
        sqlx::query("INSERT OR REPLACE INTO keel_metadata (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(DIGEST_KEY)
            .bind(digest)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Removes the stored digest, forcing a full recreate on the next open.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the delete.
    pub async fn clear(conn: &mut SqliteConnection) -> Result<()> {
        if Self::table_exists(conn).await? {
            sqlx::query("DELETE FROM keel_metadata WHERE key = ?")
                .bind(DIGEST_KEY)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_fresh_database_has_no_digest() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(!DigestStore::table_exists(&mut conn).await.unwrap());
        assert_eq!(DigestStore::load(&mut conn).await.unwrap(), None);
        // Loading is read-only.
        assert!(!DigestStore::table_exists(&mut conn).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_and_replace() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        DigestStore::save(&mut conn, "AAAA").await.unwrap();
        let first = DigestStore::load(&mut conn).await.unwrap().unwrap();
        assert_eq!(first.value, "AAAA");

        DigestStore::save(&mut conn, "BBBB").await.unwrap();
        let second = DigestStore::load(&mut conn).await.unwrap().unwrap();
        assert_eq!(second.value, "BBBB");
        assert!(second.updated_at >= first.updated_at);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM keel_metadata")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        DigestStore::clear(&mut conn).await.unwrap();
        DigestStore::save(&mut conn, "AAAA").await.unwrap();
        DigestStore::clear(&mut conn).await.unwrap();
        assert_eq!(DigestStore::load(&mut conn).await.unwrap(), None);
    }
}
