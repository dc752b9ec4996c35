//! Per-column capability traits.
//!
//! `#[derive(Model)]` emits one zero-sized type per column and implements
//! [`Column`] plus exactly the `Supports*` traits its helper set enables.
//! The builder methods are provided methods of those traits, so asking a
//! column for an operation it does not expose fails to compile.
//!
//! ```rust
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//!
//! #[derive(Debug, Default, Model)]
//! struct Item {
//!     #[primary_key]
//!     id: i64,
//!     #[column(helpers(eq))]
//!     name: String,
//! }
//!
//! let condition = Item::name().eq("lamp");
//! assert_eq!(condition.expr().sql(), "\"name\" = ?");
//! ```
//!
//! ```compile_fail
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//!
//! #[derive(Debug, Default, Model)]
//! struct Item {
//!     #[primary_key]
//!     id: i64,
//!     #[column(helpers(eq))]
//!     name: String,
//! }
//!
//! // `name` only exposes `eq`.
//! let ordering = Item::name().asc();
//! ```

use super::expr::{ConditionOp, Condition, Expr, OrderDirection, Ordering};
use super::value::{SqlValue, ToSqlValue};
use crate::model::Model;

/// A mapped column of a model.
pub trait Column: Copy {
    /// The model the column belongs to.
    type Model: Model;
    /// The Rust type of a non-NULL value; operands of conditions.
    type Type: ToSqlValue;
    /// The declared field type, `Option<Type>` for nullable columns.
    type Value: ToSqlValue;
    /// Column name.
    const NAME: &'static str;
    /// Ordinal in the table, which is also its position in a row.
    const INDEX: usize;

    /// Returns the column name.
    #[must_use]
    fn name(self) -> &'static str {
        Self::NAME
    }
}

fn condition<C: Column>(op: ConditionOp, values: Vec<SqlValue>) -> Condition<C::Model> {
    Condition::new(Expr::compare(C::NAME, op, values))
}

/// Exposes `column = ?`.
pub trait SupportsEq: Column {
    /// Creates an equality condition.
    fn eq<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::Eq, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column <> ?`.
pub trait SupportsNotEq: Column {
    /// Creates an inequality condition.
    fn not_eq<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::NotEq, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column IS NULL`.
pub trait SupportsIsNull: Column {
    /// Creates an IS NULL condition.
    fn is_null(self) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::IsNull, Vec::new())
    }
}

/// Exposes `column IS NOT NULL`.
pub trait SupportsIsNotNull: Column {
    /// Creates an IS NOT NULL condition.
    fn is_not_null(self) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::IsNotNull, Vec::new())
    }
}

/// Exposes `column IN (...)`.
pub trait SupportsIn: Column {
    /// Creates an IN condition.
    fn in_list<I, V>(self, values: I) -> Condition<Self::Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Self::Type>,
    {
        let values = values.into_iter().map(|v| v.into().to_sql_value()).collect();
        condition::<Self>(ConditionOp::In, values)
    }
}

/// Exposes `column NOT IN (...)`.
pub trait SupportsNotIn: Column {
    /// Creates a NOT IN condition.
    fn not_in_list<I, V>(self, values: I) -> Condition<Self::Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Self::Type>,
    {
        let values = values.into_iter().map(|v| v.into().to_sql_value()).collect();
        condition::<Self>(ConditionOp::NotIn, values)
    }
}

/// Exposes `column < ?`.
pub trait SupportsLt: Column {
    /// Creates a less-than condition.
    fn lt<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::Lt, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column <= ?`.
pub trait SupportsLe: Column {
    /// Creates a less-than-or-equal condition.
    fn le<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::Le, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column > ?`.
pub trait SupportsGt: Column {
    /// Creates a greater-than condition.
    fn gt<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::Gt, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column >= ?`.
pub trait SupportsGe: Column {
    /// Creates a greater-than-or-equal condition.
    fn ge<V: Into<Self::Type>>(self, value: V) -> Condition<Self::Model> {
        condition::<Self>(ConditionOp::Ge, vec![value.into().to_sql_value()])
    }
}

/// Exposes `column BETWEEN ? AND ?`.
pub trait SupportsBetween: Column {
    /// Creates a BETWEEN condition.
    fn between<L: Into<Self::Type>, H: Into<Self::Type>>(self, low: L, high: H) -> Condition<Self::Model> {
        condition::<Self>(
            ConditionOp::Between,
            vec![low.into().to_sql_value(), high.into().to_sql_value()],
        )
    }
}

/// Exposes `ORDER BY column ASC`.
pub trait SupportsOrderAsc: Column {
    /// Creates an ascending ordering.
    fn asc(self) -> Ordering<Self::Model> {
        Ordering::new(Self::NAME, OrderDirection::Asc)
    }
}

/// Exposes `ORDER BY column DESC`.
pub trait SupportsOrderDesc: Column {
    /// Creates a descending ordering.
    fn desc(self) -> Ordering<Self::Model> {
        Ordering::new(Self::NAME, OrderDirection::Desc)
    }
}
