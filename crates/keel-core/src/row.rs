//! Row access for materializing models.
//!
//! A model is rebuilt from a row by ordinal: column `i` of the table is read
//! at `offset + i`. The offset lets one result row carry the columns of
//! several tables side by side.

use thiserror::Error;

use crate::builder::{FromSqlValue, SqlValue, ValueError};

/// Failure to read a model out of a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The row is shorter than the model needs.
    #[error("column index {index} out of bounds for a row of {len} values")]
    IndexOutOfBounds {
        /// Requested ordinal.
        index: usize,
        /// Number of values in the row.
        len: usize,
    },

    /// A value does not convert into the field type.
    #[error("column `{column}` (index {index}): {source}")]
    Value {
        /// Column name.
        column: String,
        /// Ordinal in the row.
        index: usize,
        /// Conversion failure.
        #[source]
        source: ValueError,
    },

    /// The row source itself failed.
    #[error("row source error at index {index}: {message}")]
    Source {
        /// Ordinal in the row.
        index: usize,
        /// Backend message.
        message: String,
    },
}

/// A cursor positioned on one row.
pub trait RowSource {
    /// Number of values in the row.
    fn len(&self) -> usize;

    /// Returns `true` if the row has no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::IndexOutOfBounds`] past the end, or
    /// [`RowError::Source`] when the backend cannot decode the value.
    fn value(&self, index: usize) -> Result<SqlValue, RowError>;
}

/// Reads and converts one column.
///
/// # Errors
///
/// Propagates the row source error, or wraps the conversion failure with
/// the column name and ordinal.
pub fn read_column<T, R>(row: &R, index: usize, column: &str) -> Result<T, RowError>
where
    T: FromSqlValue,
    R: RowSource + ?Sized,
{
    let value = row.value(index)?;
    T::from_sql_value(value).map_err(|source| RowError::Value {
        column: column.to_string(),
        index,
        source,
    })
}

/// An in-memory row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRow(Vec<SqlValue>);

impl ValueRow {
    /// Creates a row from values in ordinal order.
    #[must_use]
    pub const fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    /// The values in ordinal order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    /// Appends the values of another row, as a join would.
    #[must_use]
    pub fn concat(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl From<Vec<SqlValue>> for ValueRow {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

impl RowSource for ValueRow {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn value(&self, index: usize) -> Result<SqlValue, RowError> {
        self.0.get(index).cloned().ok_or(RowError::IndexOutOfBounds {
            index,
            len: self.0.len(),
        })
    }
}
