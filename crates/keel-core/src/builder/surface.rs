//! The run-time form of a table's builder contract.

use super::expr::{ConditionOp, Expr, OrderDirection, OrderTerm};
use super::value::SqlValue;
use crate::descriptor::{Helpers, OnConflict, PrimaryKey, StorageType, TableDescriptor, ROWID};
use crate::error::SurfaceError;

/// The operations one column exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSurface {
    /// Column name.
    pub name: String,
    /// Ordinal in the table.
    pub index: usize,
    /// Storage class.
    pub storage_type: StorageType,
    /// Enabled condition helpers.
    pub conditions: Helpers,
    /// Enabled ordering helpers.
    pub orders: Helpers,
}

impl ColumnSurface {
    /// Whether the condition is exposed.
    #[must_use]
    pub const fn supports(&self, op: ConditionOp) -> bool {
        self.conditions.contains(op.helper())
    }

    /// Whether the ordering is exposed.
    #[must_use]
    pub const fn supports_order(&self, direction: OrderDirection) -> bool {
        self.orders.contains(direction.helper())
    }

    /// Exposed conditions, in helper-bit order.
    #[must_use]
    pub fn condition_ops(&self) -> Vec<ConditionOp> {
        ConditionOp::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

/// How update and delete address a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    /// By the declared primary key column.
    Column(String),
    /// By the engine's implicit row id.
    RowId,
}

impl RowTarget {
    /// The column compared against the key value.
    #[must_use]
    pub fn column_name(&self) -> &str {
        match self {
            Self::Column(name) => name,
            Self::RowId => ROWID,
        }
    }
}

/// What an insert may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertContract {
    /// Every selectable conflict-resolution variant.
    pub conflict_variants: [OnConflict; 6],
    /// The column left out in omit-auto-key mode, if the table has one.
    pub auto_key: Option<String>,
    /// Columns written when the auto key is omitted.
    pub columns: Vec<String>,
}

/// The builder contract of one table, derived from its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSurface {
    /// Table name.
    pub table: String,
    /// One entry per column, in declaration order.
    pub columns: Vec<ColumnSurface>,
    /// Insert contract.
    pub insert: InsertContract,
    /// Row targeting used by update and delete.
    pub row_target: RowTarget,
    /// Columns an update may assign (all but the primary key).
    pub updatable: Vec<String>,
}

impl TableSurface {
    /// Derives the contract of a validated table.
    #[must_use]
    pub fn derive(table: &TableDescriptor) -> Self {
        let columns = table
            .columns
            .iter()
            .enumerate()
            .map(|(index, c)| ColumnSurface {
                name: c.name.clone(),
                index,
                storage_type: c.storage_type,
                conditions: c.helpers & Helpers::CONDITIONS,
                orders: c.helpers & Helpers::ORDERS,
            })
            .collect();

        let auto_key = table
            .columns
            .iter()
            .find(|c| c.is_auto_key())
            .map(|c| c.name.clone());
        let insert = InsertContract {
            conflict_variants: OnConflict::ALL,
            columns: table
                .columns
                .iter()
                .filter(|c| !c.is_auto_key())
                .map(|c| c.name.clone())
                .collect(),
            auto_key,
        };

        let row_target = match table.primary_key() {
            PrimaryKey::Column(_) => RowTarget::Column(table.key_column_name().to_string()),
            PrimaryKey::RowId => RowTarget::RowId,
        };
        let updatable = table
            .columns
            .iter()
            .filter(|c| !c.primary_key)
            .map(|c| c.name.clone())
            .collect();

        Self {
            table: table.name.clone(),
            columns,
            insert,
            row_target,
            updatable,
        }
    }

    /// Looks up a column, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnknownColumn`] when absent.
    pub fn column(&self, name: &str) -> Result<&ColumnSurface, SurfaceError> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SurfaceError::UnknownColumn {
                table: self.table.clone(),
                column: name.to_string(),
            })
    }

    /// Builds a checked condition.
    ///
    /// # Errors
    ///
    /// Fails for an unknown column, a helper the column does not expose, or
    /// the wrong number of operands.
    pub fn condition(
        &self,
        column: &str,
        op: ConditionOp,
        values: Vec<SqlValue>,
    ) -> Result<Expr, SurfaceError> {
        let col = self.column(column)?;
        if !col.supports(op) {
            return Err(SurfaceError::HelperNotEnabled {
                table: self.table.clone(),
                column: col.name.clone(),
                helper: op.name(),
            });
        }
        if let Some(expected) = op.arity() {
            if values.len() != expected {
                return Err(SurfaceError::Arity {
                    helper: op.name(),
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(Expr::compare(&col.name, op, values))
    }

    /// Builds a checked ordering.
    ///
    /// # Errors
    ///
    /// Fails for an unknown column or a direction the column does not expose.
    pub fn order(&self, column: &str, direction: OrderDirection) -> Result<OrderTerm, SurfaceError> {
        let col = self.column(column)?;
        if !col.supports_order(direction) {
            return Err(SurfaceError::HelperNotEnabled {
                table: self.table.clone(),
                column: col.name.clone(),
                helper: direction.name(),
            });
        }
        Ok(OrderTerm {
            column: col.name.clone(),
            direction,
        })
    }

    /// `key = ?` for single-row update and delete.
    #[must_use]
    pub fn key_condition(&self, key: SqlValue) -> Expr {
        Expr::compare(self.row_target.column_name(), ConditionOp::Eq, vec![key])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ColumnDescriptor;

    fn item() -> TableDescriptor {
        TableDescriptor::new("Item")
            .column(ColumnDescriptor::new("id", StorageType::Integer).primary_key(true))
            .column(ColumnDescriptor::new("name", StorageType::Text).helpers(Helpers::EQ | Helpers::ORDER_ASC))
            .column(
                ColumnDescriptor::new("payload", StorageType::Blob)
                    .nullable()
                    .helpers(Helpers::automatic(StorageType::Blob, true)),
            )
    }

    #[test]
    fn test_derive_contract() {
        let surface = TableSurface::derive(&item());
        assert_eq!(surface.table, "Item");
        assert_eq!(surface.row_target, RowTarget::Column("id".to_string()));
        assert_eq!(surface.insert.auto_key.as_deref(), Some("id"));
        assert_eq!(surface.insert.columns, vec!["name", "payload"]);
        assert_eq!(surface.insert.conflict_variants, OnConflict::ALL);
        assert_eq!(surface.updatable, vec!["name", "payload"]);
        assert_eq!(surface.columns[1].condition_ops(), vec![ConditionOp::Eq]);
    }

    #[test]
    fn test_blob_has_no_ordering() {
        let surface = TableSurface::derive(&item());
        let payload = surface.column("PAYLOAD").unwrap();
        assert!(payload.orders.is_empty());
        assert!(payload.supports(ConditionOp::IsNull));
        assert!(!payload.supports(ConditionOp::Lt));
        assert!(matches!(
            surface.order("payload", OrderDirection::Asc),
            Err(SurfaceError::HelperNotEnabled { helper: "order_asc", .. })
        ));
    }

    #[test]
    fn test_checked_condition() {
        let surface = TableSurface::derive(&item());
        let expr = surface
            .condition("name", ConditionOp::Eq, vec![SqlValue::Text("a".into())])
            .unwrap();
        assert_eq!(expr.sql(), "\"name\" = ?");

        assert_eq!(
            surface.condition("name", ConditionOp::NotEq, vec![SqlValue::Null]),
            Err(SurfaceError::HelperNotEnabled {
                table: "Item".to_string(),
                column: "name".to_string(),
                helper: "not_eq",
            })
        );
        assert_eq!(
            surface.condition("id", ConditionOp::Between, vec![SqlValue::Integer(1)]),
            Err(SurfaceError::Arity {
                helper: "between",
                expected: 2,
                found: 1,
            })
        );
        assert!(matches!(
            surface.condition("missing", ConditionOp::Eq, vec![]),
            Err(SurfaceError::UnknownColumn { .. })
        ));
        assert!(surface
            .condition("id", ConditionOp::In, vec![SqlValue::Integer(1); 3])
            .is_ok());
    }

    #[test]
    fn test_rowid_target() {
        let table = TableDescriptor::new("Log").column(ColumnDescriptor::new("message", StorageType::Text));
        let surface = TableSurface::derive(&table);
        assert_eq!(surface.row_target, RowTarget::RowId);
        assert!(surface.insert.auto_key.is_none());
        assert_eq!(
            surface.key_condition(SqlValue::Integer(1)).sql(),
            "\"_rowid_\" = ?"
        );
    }
}
