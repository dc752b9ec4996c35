//! Cursor adapter between `sqlx` rows and model materialization.

use keel_core::builder::SqlValue;
use keel_core::row::{RowError, RowSource};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Decode, Row, TypeInfo, ValueRef};

/// A fetched SQLite row seen as a [`RowSource`].
///
/// Values are decoded by their runtime storage class, not the declared
/// column type, so expressions and aggregates read back as well.
#[derive(Clone, Copy)]
pub struct SqliteRowSource<'r> {
    row: &'r SqliteRow,
}

impl<'r> SqliteRowSource<'r> {
    /// Wraps a fetched row.
    #[must_use]
    pub const fn new(row: &'r SqliteRow) -> Self {
        Self { row }
    }
}

impl std::fmt::Debug for SqliteRowSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRowSource")
            .field("len", &self.row.len())
            .finish()
    }
}

impl RowSource for SqliteRowSource<'_> {
    fn len(&self) -> usize {
        self.row.len()
    }

    fn value(&self, index: usize) -> Result<SqlValue, RowError> {
        let len = self.row.len();
        if index >= len {
            return Err(RowError::IndexOutOfBounds { index, len });
        }
        let source_error = |message: String| RowError::Source { index, message };

        let raw = self
            .row
            .try_get_raw(index)
            .map_err(|e| source_error(e.to_string()))?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let type_name = raw.type_info().name().to_ascii_uppercase();
        let value = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => <i64 as Decode<Sqlite>>::decode(raw).map(SqlValue::Integer),
            "REAL" | "NUMERIC" => <f64 as Decode<Sqlite>>::decode(raw).map(SqlValue::Real),
            "BLOB" => <Vec<u8> as Decode<Sqlite>>::decode(raw).map(SqlValue::Blob),
            _ => <String as Decode<Sqlite>>::decode(raw).map(SqlValue::Text),
        };
        value.map_err(|e| source_error(e.to_string()))
    }
}
