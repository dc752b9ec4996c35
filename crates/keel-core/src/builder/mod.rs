//! Query-builder surface.
//!
//! Two faces over the same descriptor:
//!
//! - the typed face: per-model builders ([`Selector`], [`Inserter`],
//!   [`Updater`], [`Deleter`]) that only accept conditions and orderings
//!   produced by the capability traits of the model's own columns;
//! - the dynamic face: [`TableSurface`], the same contract derived at run
//!   time from a [`TableDescriptor`](crate::descriptor::TableDescriptor),
//!   which checks helpers and arity and reports misuse as a
//!   [`SurfaceError`](crate::error::SurfaceError).
//!
//! All builders render `(String, Vec<SqlValue>)` with `?` placeholders.
//!
//! ```rust
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//!
//! #[derive(Debug, Default, Model)]
//! struct Item {
//!     #[primary_key]
//!     id: i64,
//!     #[column(indexed)]
//!     name: String,
//! }
//!
//! let (sql, params) = Selector::<Item>::new()
//!     .where_clause(Item::name().eq("lamp"))
//!     .order(Item::id().desc())
//!     .limit(10)
//!     .build();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT \"id\", \"name\" FROM \"Item\" WHERE \"name\" = ? ORDER BY \"id\" DESC LIMIT 10"
//! );
//! assert_eq!(params, vec![SqlValue::Text("lamp".into())]);
//! ```

mod capability;
mod delete;
mod expr;
mod insert;
mod select;
mod surface;
mod update;
pub mod value;

pub use capability::{
    Column, SupportsBetween, SupportsEq, SupportsGe, SupportsGt, SupportsIn, SupportsIsNotNull,
    SupportsIsNull, SupportsLe, SupportsLt, SupportsNotEq, SupportsNotIn, SupportsOrderAsc,
    SupportsOrderDesc,
};
pub use delete::Deleter;
pub use expr::{quote, Condition, ConditionOp, Expr, OrderDirection, OrderTerm, Ordering};
pub use insert::{Inserter, MAX_BIND_PARAMETERS};
pub use select::Selector;
pub use surface::{ColumnSurface, InsertContract, RowTarget, TableSurface};
pub use update::{HasSet, NoSet, Updater};
pub use value::{FromSqlValue, SqlValue, ToSqlValue, ValueError};

use crate::model::Model;

/// Marker: no row target chosen yet.
pub struct Untargeted;
/// Marker: rows are targeted by key, by condition, or explicitly all of them.
pub struct Targeted;

/// `key_column = ?` for a model's table.
pub(crate) fn key_condition<M: Model>(key: SqlValue) -> Expr {
    let descriptor = M::descriptor();
    Expr::compare(descriptor.key_column_name(), ConditionOp::Eq, vec![key])
}

/// Renders `WHERE a AND b` (with the leading space), or nothing.
pub(crate) fn where_sql(conditions: &[Expr], sql: &mut String, params: &mut Vec<SqlValue>) {
    if conditions.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    let parts: Vec<&str> = conditions.iter().map(Expr::sql).collect();
    sql.push_str(&parts.join(" AND "));
    for condition in conditions {
        params.extend(condition.params().iter().cloned());
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-written models standing in for derived ones.

    use std::sync::{Arc, OnceLock};

    use super::*;
    use crate::descriptor::{ColumnDescriptor, StorageType, TableDescriptor};
    use crate::row::{read_column, RowError, RowSource};

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Item {
        pub id: i64,
        pub name: String,
        pub rank: Option<i64>,
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct ItemId;
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ItemName;
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ItemRank;

    impl Model for Item {
        const TABLE: &'static str = "Item";
        const COLUMNS: &'static [&'static str] = &["id", "name", "rank"];

        fn descriptor() -> Arc<TableDescriptor> {
            static DESCRIPTOR: OnceLock<Arc<TableDescriptor>> = OnceLock::new();
            DESCRIPTOR
                .get_or_init(|| {
                    Arc::new(
                        TableDescriptor::new("Item")
                            .column(ColumnDescriptor::new("id", StorageType::Integer).primary_key(true))
                            .column(ColumnDescriptor::new("name", StorageType::Text).unique())
                            .column(ColumnDescriptor::new("rank", StorageType::Integer).nullable()),
                    )
                })
                .clone()
        }

        fn to_values(&self) -> Vec<SqlValue> {
            vec![
                self.id.to_sql_value(),
                self.name.clone().to_sql_value(),
                self.rank.to_sql_value(),
            ]
        }

        fn from_row<R: RowSource + ?Sized>(row: &R, offset: usize) -> Result<Self, RowError> {
            Ok(Self {
                id: read_column(row, offset, "id")?,
                name: read_column(row, offset + 1, "name")?,
                rank: read_column(row, offset + 2, "rank")?,
            })
        }

        fn primary_key_value(&self) -> Option<SqlValue> {
            Some(self.id.to_sql_value())
        }
    }

    impl Column for ItemId {
        type Model = Item;
        type Type = i64;
        type Value = i64;
        const NAME: &'static str = "id";
        const INDEX: usize = 0;
    }
    impl SupportsEq for ItemId {}
    impl SupportsIn for ItemId {}
    impl SupportsOrderAsc for ItemId {}
    impl SupportsOrderDesc for ItemId {}

    impl Column for ItemName {
        type Model = Item;
        type Type = String;
        type Value = String;
        const NAME: &'static str = "name";
        const INDEX: usize = 1;
    }
    impl SupportsEq for ItemName {}
    impl SupportsNotEq for ItemName {}

    impl Column for ItemRank {
        type Model = Item;
        type Type = i64;
        type Value = Option<i64>;
        const NAME: &'static str = "rank";
        const INDEX: usize = 2;
    }
    impl SupportsIsNull for ItemRank {}
    impl SupportsBetween for ItemRank {}
    impl SupportsGe for ItemRank {}

    /// A table without a declared key.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Log {
        pub message: String,
    }

    impl Model for Log {
        const TABLE: &'static str = "Log";
        const COLUMNS: &'static [&'static str] = &["message"];

        fn descriptor() -> Arc<TableDescriptor> {
            static DESCRIPTOR: OnceLock<Arc<TableDescriptor>> = OnceLock::new();
            DESCRIPTOR
                .get_or_init(|| {
                    Arc::new(
                        TableDescriptor::new("Log")
                            .column(ColumnDescriptor::new("message", StorageType::Text)),
                    )
                })
                .clone()
        }

        fn to_values(&self) -> Vec<SqlValue> {
            vec![self.message.clone().to_sql_value()]
        }

        fn from_row<R: RowSource + ?Sized>(row: &R, offset: usize) -> Result<Self, RowError> {
            Ok(Self {
                message: read_column(row, offset, "message")?,
            })
        }

        fn primary_key_value(&self) -> Option<SqlValue> {
            None
        }
    }
}
