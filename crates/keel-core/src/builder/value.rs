//! SQL values and conversions to and from Rust types.
//!
//! Every value reaches the engine as a bound parameter; the inline rendering
//! exists for logging only.

use thiserror::Error;

use crate::descriptor::StorageType;

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Integer(n) => format!("{n}"),
            Self::Real(f) => format!("{f:?}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => format!("X'{}'", hex::encode_upper(b)),
        }
    }

    /// Returns the parameter placeholder.
    #[must_use]
    pub const fn placeholder() -> &'static str {
        "?"
    }

    /// The storage class of the value, `None` for NULL.
    #[must_use]
    pub const fn storage_type(&self) -> Option<StorageType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(StorageType::Integer),
            Self::Real(_) => Some(StorageType::Real),
            Self::Text(_) => Some(StorageType::Text),
            Self::Blob(_) => Some(StorageType::Blob),
        }
    }

    /// Name used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.storage_type() {
            None => "NULL",
            Some(storage_type) => storage_type.as_sql(),
        }
    }

    /// Returns `true` for NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Integer(i64::from(self))
    }
}

macro_rules! integer_to_sql {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Integer(i64::from(self))
                }
            }
        )*
    };
}

integer_to_sql!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Real(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Real(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

/// A stored value does not fit the requested Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has another storage class.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested Rust type.
        expected: &'static str,
        /// Storage class of the value.
        found: &'static str,
    },

    /// The integer does not fit.
    #[error("{value} is out of range for {expected}")]
    OutOfRange {
        /// Requested Rust type.
        expected: &'static str,
        /// The stored integer.
        value: i64,
    },

    /// NULL where a value is required.
    #[error("unexpected NULL for {expected}")]
    UnexpectedNull {
        /// Requested Rust type.
        expected: &'static str,
    },
}

/// Trait for types that can be read back from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a stored value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] when the value has the wrong storage class,
    /// does not fit, or is NULL for a non-`Option` type.
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

fn mismatch<T>(expected: &'static str, value: &SqlValue) -> Result<T, ValueError> {
    if value.is_null() {
        Err(ValueError::UnexpectedNull { expected })
    } else {
        Err(ValueError::TypeMismatch {
            expected,
            found: value.type_name(),
        })
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Integer(n) => Ok(n != 0),
            other => mismatch("bool", &other),
        }
    }
}

macro_rules! integer_from_sql {
    ($($ty:ty),*) => {
        $(
            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
                    match value {
                        SqlValue::Integer(n) => <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange {
                            expected: stringify!($ty),
                            value: n,
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

integer_from_sql!(i8, i16, i32, i64, u8, u16, u32);

impl FromSqlValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Real(f) => Ok(f),
            // REAL affinity stores integral values as integers.
            SqlValue::Integer(n) => Ok(n as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        f64::from_sql_value(value).map(|f| f as f32)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => mismatch("String", &other),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}
