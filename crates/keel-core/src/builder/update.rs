//! UPDATE builder.

use std::marker::PhantomData;

use super::capability::Column;
use super::expr::{quote, Condition, Expr};
use super::value::{SqlValue, ToSqlValue};
use super::{key_condition, where_sql, Targeted, Untargeted};
use crate::descriptor::OnConflict;
use crate::error::SurfaceError;
use crate::model::Model;

/// Marker: No assignment yet.
pub struct NoSet;
/// Marker: At least one assignment.
pub struct HasSet;

/// Updates rows of `M`.
///
/// Only buildable once it has an assignment and a row target:
///
/// ```compile_fail
/// use keel_core::prelude::*;
/// use keel_derive::Model;
///
/// #[derive(Debug, Default, Model)]
/// struct Item {
///     #[primary_key]
///     id: i64,
///     #[column]
///     name: String,
/// }
///
/// // No target: would update every row.
/// let _ = Updater::<Item>::new().set(Item::name(), "lamp").build();
/// ```
pub struct Updater<M, S = NoSet, T = Untargeted> {
    assignments: Vec<(&'static str, SqlValue)>,
    conditions: Vec<Expr>,
    on_conflict: OnConflict,
    _state: PhantomData<(fn() -> M, S, T)>,
}

impl<M: Model> Updater<M, NoSet, Untargeted> {
    /// Creates an empty updater.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            assignments: Vec::new(),
            conditions: Vec::new(),
            on_conflict: OnConflict::None,
            _state: PhantomData,
        }
    }
}

impl<M: Model> Default for Updater<M, NoSet, Untargeted> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model, S, T> Updater<M, S, T> {
    fn transition<S2, T2>(self) -> Updater<M, S2, T2> {
        Updater {
            assignments: self.assignments,
            conditions: self.conditions,
            on_conflict: self.on_conflict,
            _state: PhantomData,
        }
    }

    /// Assigns a column.
    #[must_use]
    pub fn set<C, V>(mut self, _column: C, value: V) -> Updater<M, HasSet, T>
    where
        C: Column<Model = M>,
        V: Into<C::Value>,
    {
        self.assignments.push((C::NAME, value.into().to_sql_value()));
        self.transition()
    }

    /// Assigns every column except the primary key from `model`.
    #[must_use]
    pub fn set_model(mut self, model: &M) -> Updater<M, HasSet, T> {
        let descriptor = M::descriptor();
        let values = model.to_values();
        for ((name, column), value) in M::COLUMNS.iter().zip(&descriptor.columns).zip(values) {
            if !column.primary_key {
                self.assignments.push((*name, value));
            }
        }
        self.transition()
    }

    /// Selects the conflict-resolution variant (`UPDATE OR ...`).
    #[must_use]
    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Targets the row whose key equals `key`.
    #[must_use]
    pub fn by_key<V: ToSqlValue>(mut self, key: V) -> Updater<M, S, Targeted> {
        self.conditions.push(key_condition::<M>(key.to_sql_value()));
        self.transition()
    }

    /// Targets the row stored for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnresolvableKey`] when `M` has no primary key
    /// column.
    pub fn for_model(self, model: &M) -> Result<Updater<M, S, Targeted>, SurfaceError> {
        let key = model.primary_key_value().ok_or_else(|| SurfaceError::UnresolvableKey {
            table: M::TABLE.to_string(),
        })?;
        Ok(self.by_key(key))
    }

    /// Targets the rows matching `condition`; conditions are AND-ed.
    #[must_use]
    pub fn where_clause(mut self, condition: Condition<M>) -> Updater<M, S, Targeted> {
        self.conditions.push(condition.into_expr());
        self.transition()
    }
}

impl<M: Model> Updater<M, HasSet, Targeted> {
    /// Builds the statement and returns (SQL, parameters).
    #[must_use]
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("UPDATE ");
        if let Some(algorithm) = self.on_conflict.as_sql() {
            sql.push_str("OR ");
            sql.push_str(algorithm);
            sql.push(' ');
        }
        sql.push_str(&quote(M::TABLE));
        sql.push_str(" SET ");

        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(name, _)| format!("{} = ?", quote(name)))
            .collect();
        sql.push_str(&sets.join(", "));

        let mut params: Vec<SqlValue> = self.assignments.iter().map(|(_, v)| v.clone()).collect();
        where_sql(&self.conditions, &mut sql, &mut params);
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{Item, ItemName, ItemRank, Log};
    use crate::builder::{SupportsEq, SupportsGe};

    #[test]
    fn test_update_by_key() {
        let (sql, params) = Updater::<Item>::new()
            .set(ItemName, "lamp".to_string())
            .set(ItemRank, None::<i64>)
            .by_key(7)
            .build();
        assert_eq!(sql, "UPDATE \"Item\" SET \"name\" = ?, \"rank\" = ? WHERE \"id\" = ?");
        assert_eq!(
            params,
            vec![
                SqlValue::Text("lamp".into()),
                SqlValue::Null,
                SqlValue::Integer(7)
            ]
        );
    }

    #[test]
    fn test_update_where_with_conflict() {
        let (sql, params) = Updater::<Item>::new()
            .where_clause(ItemRank.ge(3))
            .on_conflict(OnConflict::Ignore)
            .set(ItemRank, 1_i64)
            .build();
        assert_eq!(sql, "UPDATE OR IGNORE \"Item\" SET \"rank\" = ? WHERE \"rank\" >= ?");
        assert_eq!(params, vec![SqlValue::Integer(1), SqlValue::Integer(3)]);
    }

    #[test]
    fn test_update_for_model() {
        let item = Item {
            id: 3,
            name: "desk".to_string(),
            rank: Some(1),
        };
        let (sql, params) = Updater::<Item>::new()
            .set_model(&item)
            .for_model(&item)
            .unwrap()
            .where_clause(ItemName.eq("desk"))
            .build();
        assert_eq!(
            sql,
            "UPDATE \"Item\" SET \"name\" = ?, \"rank\" = ? WHERE \"id\" = ? AND \"name\" = ?"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_rowid_table_needs_explicit_key() {
        let log = Log {
            message: "x".to_string(),
        };
        let err = Updater::<Log>::new().set_model(&log).for_model(&log).err();
        assert_eq!(
            err,
            Some(SurfaceError::UnresolvableKey {
                table: "Log".to_string()
            })
        );

        let (sql, _) = Updater::<Log>::new().set_model(&log).by_key(1).build();
        assert_eq!(sql, "UPDATE \"Log\" SET \"message\" = ? WHERE \"_rowid_\" = ?");
    }
}
