//! Opening a database and running builder statements.

use std::fmt;
use std::sync::Arc;

use keel_core::builder::{Deleter, HasSet, Inserter, Selector, SqlValue, Targeted, Updater};
use keel_core::model::Model;
use keel_core::schema::Schema;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnection, SqlitePool, SqliteQueryResult, SqliteRow,
};
use sqlx::{Executor, Row};
use tracing::debug;

use crate::error::Result;
use crate::migrator::{MigrationReport, SchemaMigrator};
use crate::options::DatabaseOptions;
use crate::row::SqliteRowSource;

/// An opened, migrated database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    schema: Arc<Schema>,
    report: MigrationReport,
}

impl Database {
    /// Connects with `options` and brings the database in line with `schema`.
    ///
    /// # Errors
    ///
    /// Returns the connection error, or the migration error of the open step.
    pub async fn open(options: &DatabaseOptions, schema: Schema) -> Result<Self> {
        let pool = options.connect().await?;
        let report = SchemaMigrator::new(&schema)
            .dry_run(options.dry_run)
            .foreign_keys(options.foreign_keys)
            .migrate(&pool)
            .await?;
        Ok(Self {
            pool,
            schema: Arc::new(schema),
            report,
        })
    }

    /// Migrates an existing pool.
    ///
    /// # Errors
    ///
    /// Returns the migration error of the open step.
    pub async fn from_pool(pool: SqlitePool, schema: Schema) -> Result<Self> {
        let report = SchemaMigrator::new(&schema).migrate(&pool).await?;
        Ok(Self {
            pool,
            schema: Arc::new(schema),
            report,
        })
    }

    /// A handle for running statements.
    #[must_use]
    pub fn connection(&self) -> Connection {
        Connection::new(self.pool.clone())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The schema the database was opened with.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// What the open step decided and did.
    #[must_use]
    pub const fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs builder statements against a pool.
///
/// Every call uses whichever pooled connection is free and commits on its
/// own. Use [`Connection::begin`] to run several statements as one unit.
#[derive(Debug, Clone)]
pub struct Connection {
    pool: SqlitePool,
}

impl Connection {
    /// Wraps a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Starts a transaction on one pooled connection.
    ///
    /// # Errors
    ///
    /// Returns the engine error of `BEGIN`.
    pub async fn begin(&self) -> Result<Transaction> {
        let tx = self.pool.begin().await?;
        debug!("Transaction started");
        Ok(Transaction { tx })
    }

    /// Inserts `model` with the default inserter.
    ///
    /// Returns the row id of the new row, or `None` when a conflict variant
    /// skipped it.
    ///
    /// # Errors
    ///
    /// Returns the engine error, e.g. a constraint violation under ABORT.
    pub async fn insert<M: Model>(&self, model: &M) -> Result<Option<i64>> {
        insert_one(&self.pool, &Inserter::new(), model).await
    }

    /// Inserts `model` with an explicit inserter.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn insert_with<M: Model>(
        &self,
        inserter: &Inserter<M>,
        model: &M,
    ) -> Result<Option<i64>> {
        insert_one(&self.pool, inserter, model).await
    }

    /// Inserts every model in one transaction; returns the rows written.
    ///
    /// Large inputs are split into several statements that each stay under
    /// the engine's bound-parameter limit.
    ///
    /// # Errors
    ///
    /// Returns the engine error; nothing is written in that case.
    pub async fn insert_all<M: Model>(&self, inserter: &Inserter<M>, models: &[M]) -> Result<u64> {
        if models.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        match insert_rows(&mut tx, inserter, models).await {
            Ok(written) => {
                tx.commit().await?;
                Ok(written)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Fetches every row matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns the engine error, or [`RowError`](keel_core::row::RowError)
    /// wrapped in [`MigrationError::Row`](crate::MigrationError::Row) when a
    /// row does not convert.
    pub async fn select<M: Model>(&self, selector: &Selector<M>) -> Result<Vec<M>> {
        select_all(&self.pool, selector).await
    }

    /// Fetches the first matching row.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::select`].
    pub async fn select_first<M: Model>(&self, selector: &Selector<M>) -> Result<Option<M>> {
        select_one(&self.pool, selector).await
    }

    /// Counts the rows matching `selector`, ignoring its limit and ordering.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn count<M: Model>(&self, selector: &Selector<M>) -> Result<u64> {
        count_rows(&self.pool, selector).await
    }

    /// Runs an update; returns the rows changed.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn update<M: Model>(&self, updater: &Updater<M, HasSet, Targeted>) -> Result<u64> {
        let (sql, params) = updater.build();
        Ok(execute(&self.pool, &sql, params).await?.rows_affected())
    }

    /// Runs a delete; returns the rows removed.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn delete<M: Model>(&self, deleter: &Deleter<M, Targeted>) -> Result<u64> {
        let (sql, params) = deleter.build();
        Ok(execute(&self.pool, &sql, params).await?.rows_affected())
    }
}

/// Builder statements running inside one transaction.
///
/// Nothing is visible to other connections until [`Transaction::commit`].
/// Dropping the guard without committing rolls every statement back.
pub struct Transaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}

impl Transaction {
    /// Same as [`Connection::insert`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error; the transaction stays open.
    pub async fn insert<M: Model>(&mut self, model: &M) -> Result<Option<i64>> {
        insert_one(&mut *self.tx, &Inserter::new(), model).await
    }

    /// Same as [`Connection::insert_with`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error; the transaction stays open.
    pub async fn insert_with<M: Model>(
        &mut self,
        inserter: &Inserter<M>,
        model: &M,
    ) -> Result<Option<i64>> {
        insert_one(&mut *self.tx, inserter, model).await
    }

    /// Same as [`Connection::insert_all`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error; rows of earlier batches stay written until
    /// the transaction is rolled back.
    pub async fn insert_all<M: Model>(
        &mut self,
        inserter: &Inserter<M>,
        models: &[M],
    ) -> Result<u64> {
        insert_rows(&mut self.tx, inserter, models).await
    }

    /// Same as [`Connection::select`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::select`].
    pub async fn select<M: Model>(&mut self, selector: &Selector<M>) -> Result<Vec<M>> {
        select_all(&mut *self.tx, selector).await
    }

    /// Same as [`Connection::select_first`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::select`].
    pub async fn select_first<M: Model>(&mut self, selector: &Selector<M>) -> Result<Option<M>> {
        select_one(&mut *self.tx, selector).await
    }

    /// Same as [`Connection::count`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn count<M: Model>(&mut self, selector: &Selector<M>) -> Result<u64> {
        count_rows(&mut *self.tx, selector).await
    }

    /// Same as [`Connection::update`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn update<M: Model>(
        &mut self,
        updater: &Updater<M, HasSet, Targeted>,
    ) -> Result<u64> {
        let (sql, params) = updater.build();
        Ok(execute(&mut *self.tx, &sql, params).await?.rows_affected())
    }

    /// Same as [`Connection::delete`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error.
    pub async fn delete<M: Model>(&mut self, deleter: &Deleter<M, Targeted>) -> Result<u64> {
        let (sql, params) = deleter.build();
        Ok(execute(&mut *self.tx, &sql, params).await?.rows_affected())
    }

    /// Makes every statement of the transaction permanent.
    ///
    /// # Errors
    ///
    /// Returns the engine error of `COMMIT`.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Discards every statement of the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine error of `ROLLBACK`.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

// ============================================================================
// Statement execution
// ============================================================================

async fn execute<'c, E>(
    executor: E,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<SqliteQueryResult>
where
    E: Executor<'c, Database = Sqlite>,
{
    debug!(sql = %sql, params = params.len(), "Executing SQL");
    Ok(bind_values(sqlx::query(sql), params).execute(executor).await?)
}

async fn insert_one<'c, E, M>(
    executor: E,
    inserter: &Inserter<M>,
    model: &M,
) -> Result<Option<i64>>
where
    E: Executor<'c, Database = Sqlite>,
    M: Model,
{
    let (sql, params) = inserter.build(model);
    let result = execute(executor, &sql, params).await?;
    Ok((result.rows_affected() > 0).then(|| result.last_insert_rowid()))
}

async fn insert_rows<M: Model>(
    conn: &mut SqliteConnection,
    inserter: &Inserter<M>,
    models: &[M],
) -> Result<u64> {
    let batches = inserter.build_batches(models);
    let mut written = 0;
    if batches.is_empty() {
        // Only an omitted auto key: DEFAULT VALUES, one row at a time.
        for model in models {
            let (sql, params) = inserter.build(model);
            written += execute(&mut *conn, &sql, params).await?.rows_affected();
        }
    } else {
        debug!(rows = models.len(), statements = batches.len(), "Executing bulk insert");
        for (sql, params) in batches {
            written += execute(&mut *conn, &sql, params).await?.rows_affected();
        }
    }
    Ok(written)
}

async fn fetch_rows<'c, E>(
    executor: E,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<SqliteRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    debug!(sql = %sql, params = params.len(), "Executing query");
    Ok(bind_values(sqlx::query(sql), params).fetch_all(executor).await?)
}

async fn select_all<'c, E, M>(executor: E, selector: &Selector<M>) -> Result<Vec<M>>
where
    E: Executor<'c, Database = Sqlite>,
    M: Model,
{
    let (sql, params) = selector.build();
    let rows = fetch_rows(executor, &sql, params).await?;
    let mut models = Vec::with_capacity(rows.len());
    for row in &rows {
        models.push(M::from_row(&SqliteRowSource::new(row), 0)?);
    }
    Ok(models)
}

async fn select_one<'c, E, M>(executor: E, selector: &Selector<M>) -> Result<Option<M>>
where
    E: Executor<'c, Database = Sqlite>,
    M: Model,
{
    let (sql, params) = selector.build();
    debug!(sql = %sql, params = params.len(), "Executing query");
    let row = bind_values(sqlx::query(&sql), params)
        .fetch_optional(executor)
        .await?;
    match row {
        Some(row) => Ok(Some(M::from_row(&SqliteRowSource::new(&row), 0)?)),
        None => Ok(None),
    }
}

async fn count_rows<'c, E, M>(executor: E, selector: &Selector<M>) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
    M: Model,
{
    let (sql, params) = selector.count();
    debug!(sql = %sql, "Executing count");
    let row = bind_values(sqlx::query(&sql), params)
        .fetch_one(executor)
        .await?;
    let count: i64 = row.try_get(0)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Binds builder parameters in order.
fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Integer(i) => query.bind(i),
            SqlValue::Real(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Blob(b) => query.bind(b),
        };
    }
    query
}
