//! The trait implemented by `#[derive(Model)]`.

use std::sync::Arc;

use crate::builder::SqlValue;
use crate::descriptor::TableDescriptor;
use crate::row::{RowError, RowSource};

/// A struct mapped to one table.
///
/// The derive macro implements this together with one [`Column`] type per
/// mapped field. Column order everywhere (values, rows, DDL) is field
/// declaration order.
///
/// [`Column`]: crate::builder::Column
pub trait Model: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Column names in declaration order.
    const COLUMNS: &'static [&'static str];
    /// Number of mapped columns, i.e. how many row values `from_row` consumes.
    const COLUMN_COUNT: usize = Self::COLUMNS.len();

    /// The shared, immutable descriptor of the table.
    fn descriptor() -> Arc<TableDescriptor>;

    /// Values of every mapped column, in declaration order.
    fn to_values(&self) -> Vec<SqlValue>;

    /// Rebuilds a model from the row values starting at `offset`.
    ///
    /// Unmapped fields are filled with their `Default`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RowError`] met while reading columns.
    fn from_row<R: RowSource + ?Sized>(row: &R, offset: usize) -> Result<Self, RowError>;

    /// The primary key value, `None` when rows are addressed by row id.
    fn primary_key_value(&self) -> Option<SqlValue>;
}
