//! Database-open migration step.
//!
//! The migrator compares the persisted digest with the compiled schema. When
//! they differ it drops every user table and recreates the whole schema in a
//! single transaction; there is no incremental ALTER path.

use keel_core::compile::{SchemaDialect, SqliteDialect};
use keel_core::migration::{compare, MigrationDecision};
use keel_core::schema::Schema;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::digest_store::{DigestStore, METADATA_TABLE};
use crate::error::{MigrationError, Result};

/// What a migration run decided and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// The comparator's verdict.
    pub decision: MigrationDecision,
    /// The digest found in the database, if any.
    pub stored_digest: Option<String>,
    /// The digest of the compiled schema.
    pub digest: String,
    /// Tables dropped before recreating, sorted by name.
    pub dropped: Vec<String>,
    /// Every statement of the run, drops first. Empty when nothing was needed.
    pub statements: Vec<String>,
    /// Whether the statements were only logged.
    pub dry_run: bool,
}

impl MigrationReport {
    /// Whether statements were actually executed.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.decision.requires_migration() && !self.dry_run
    }
}

/// Brings a database in line with a compiled [`Schema`].
#[derive(Debug, Clone, Copy)]
pub struct SchemaMigrator<'a> {
    schema: &'a Schema,
    dry_run: bool,
    foreign_keys: bool,
}

impl<'a> SchemaMigrator<'a> {
    /// Creates a migrator that executes statements and leaves foreign keys on.
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            dry_run: false,
            foreign_keys: true,
        }
    }

    /// Enables dry-run mode (statements are logged, not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Foreign-key enforcement restored on the connection afterwards.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Reads the stored digest and decides, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the `sqlx` error of the lookup.
    pub async fn plan(&self, pool: &SqlitePool) -> Result<MigrationReport> {
        let mut conn = pool.acquire().await?;
        self.plan_on(&mut conn).await
    }

    async fn plan_on(&self, conn: &mut SqliteConnection) -> Result<MigrationReport> {
        let stored = DigestStore::load(conn).await?.map(|s| s.value);
        let digest = self.schema.digest();
        let decision = compare(stored.as_deref(), digest);

        let mut report = MigrationReport {
            decision,
            stored_digest: stored,
            digest: digest.to_string(),
            dropped: Vec::new(),
            statements: Vec::new(),
            dry_run: self.dry_run,
        };
        if decision.requires_migration() {
            report.dropped = user_tables(conn).await?;
            let dialect = SqliteDialect::new();
            report.statements = report
                .dropped
                .iter()
                .map(|table| dialect.drop_table(table))
                .chain(self.schema.statements().map(str::to_string))
                .collect();
        }
        Ok(report)
    }

    /// Runs the migration step.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Statement`] for the first failing statement
    /// (the transaction is rolled back and nothing is retried), or the `sqlx`
    /// error of any bookkeeping query.
    pub async fn migrate(&self, pool: &SqlitePool) -> Result<MigrationReport> {
        let mut conn = pool.acquire().await?;
        let report = self.plan_on(&mut conn).await?;

        info!(
            decision = ?report.decision,
            stored = report.stored_digest.as_deref().unwrap_or("<none>"),
            digest = %report.digest,
            "Schema migration check"
        );

        if !report.decision.requires_migration() {
            return Ok(report);
        }

        if self.dry_run {
            for sql in &report.statements {
                warn!(sql = %sql, "Dry run, statement not executed");
            }
            return Ok(report);
        }

        // PRAGMA foreign_keys is a no-op inside a transaction.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;
        let applied = self.apply(&mut conn, &report).await;
        let restore = if self.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        sqlx::query(restore).execute(&mut *conn).await?;
        applied?;

        info!(
            dropped = report.dropped.len(),
            statements = report.statements.len(),
            digest = %report.digest,
            "Schema recreated"
        );
        Ok(report)
    }

    async fn apply(&self, conn: &mut SqliteConnection, report: &MigrationReport) -> Result<()> {
        let mut tx = conn.begin().await?;
        for sql in &report.statements {
            debug!(sql = %sql, "Executing SQL");
            if let Err(source) = sqlx::query(sql).execute(&mut *tx).await {
                tx.rollback().await?;
                return Err(MigrationError::Statement {
                    sql: sql.clone(),
                    source,
                });
            }
        }
        DigestStore::save(&mut tx, self.schema.digest().as_str()).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Every table except the engine's own and the metadata table.
async fn user_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> ? ORDER BY name",
    )
    .bind(METADATA_TABLE)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}
