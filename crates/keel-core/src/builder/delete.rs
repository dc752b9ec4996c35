//! DELETE builder.

use std::marker::PhantomData;

use super::expr::{quote, Condition, Expr};
use super::value::{SqlValue, ToSqlValue};
use super::{key_condition, where_sql, Targeted, Untargeted};
use crate::error::SurfaceError;
use crate::model::Model;

/// Deletes rows of `M`.
///
/// Must be targeted (by key, by condition, or explicitly with [`all`]) before
/// it can be built, so an unconditional delete is always spelled out.
///
/// [`all`]: Deleter::all
pub struct Deleter<M, T = Untargeted> {
    conditions: Vec<Expr>,
    _state: PhantomData<(fn() -> M, T)>,
}

impl<M: Model> Deleter<M, Untargeted> {
    /// Creates an untargeted deleter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Targets every row of the table.
    #[must_use]
    pub fn all(self) -> Deleter<M, Targeted> {
        self.transition()
    }
}

impl<M: Model> Default for Deleter<M, Untargeted> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model, T> Deleter<M, T> {
    fn transition<T2>(self) -> Deleter<M, T2> {
        Deleter {
            conditions: self.conditions,
            _state: PhantomData,
        }
    }

    /// Targets the row whose key equals `key`.
    #[must_use]
    pub fn by_key<V: ToSqlValue>(mut self, key: V) -> Deleter<M, Targeted> {
        self.conditions.push(key_condition::<M>(key.to_sql_value()));
        self.transition()
    }

    /// Targets the row stored for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnresolvableKey`] when `M` has no primary key
    /// column.
    pub fn for_model(self, model: &M) -> Result<Deleter<M, Targeted>, SurfaceError> {
        let key = model.primary_key_value().ok_or_else(|| SurfaceError::UnresolvableKey {
            table: M::TABLE.to_string(),
        })?;
        Ok(self.by_key(key))
    }

    /// Targets the rows matching `condition`; conditions are AND-ed.
    #[must_use]
    pub fn where_clause(mut self, condition: Condition<M>) -> Deleter<M, Targeted> {
        self.conditions.push(condition.into_expr());
        self.transition()
    }
}

impl<M: Model> Deleter<M, Targeted> {
    /// Builds the statement and returns (SQL, parameters).
    #[must_use]
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("DELETE FROM {}", quote(M::TABLE));
        let mut params = Vec::new();
        where_sql(&self.conditions, &mut sql, &mut params);
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{Item, ItemName, ItemRank, Log};
    use crate::builder::{SupportsIsNull, SupportsNotEq};

    #[test]
    fn test_delete_by_key() {
        let (sql, params) = Deleter::<Item>::new().by_key(9_i64).build();
        assert_eq!(sql, "DELETE FROM \"Item\" WHERE \"id\" = ?");
        assert_eq!(params, vec![SqlValue::Integer(9)]);
    }

    #[test]
    fn test_delete_where() {
        let (sql, params) = Deleter::<Item>::new()
            .where_clause(ItemRank.is_null())
            .where_clause(ItemName.not_eq("keep"))
            .build();
        assert_eq!(sql, "DELETE FROM \"Item\" WHERE \"rank\" IS NULL AND \"name\" <> ?");
        assert_eq!(params, vec![SqlValue::Text("keep".into())]);
    }

    #[test]
    fn test_delete_all_is_explicit() {
        let (sql, params) = Deleter::<Item>::new().all().build();
        assert_eq!(sql, "DELETE FROM \"Item\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_delete_for_model() {
        let item = Item {
            id: 4,
            ..Item::default()
        };
        let (sql, _) = Deleter::<Item>::new().for_model(&item).unwrap().build();
        assert_eq!(sql, "DELETE FROM \"Item\" WHERE \"id\" = ?");
        assert!(Deleter::<Log>::new().for_model(&Log::default()).is_err());
    }
}
