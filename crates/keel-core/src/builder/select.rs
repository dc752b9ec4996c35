//! SELECT builder.

use std::marker::PhantomData;

use super::expr::{quote, Condition, Expr, OrderTerm, Ordering};
use super::value::SqlValue;
use super::where_sql;
use crate::model::Model;

/// Selects rows of `M`, reading every mapped column in declaration order.
pub struct Selector<M> {
    conditions: Vec<Expr>,
    orders: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Selector<M> {
    /// Creates a selector over every row.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            _model: PhantomData,
        }
    }

    /// Adds a condition; conditions are AND-ed.
    #[must_use]
    pub fn where_clause(mut self, condition: Condition<M>) -> Self {
        self.conditions.push(condition.into_expr());
        self
    }

    /// Adds an ORDER BY term; terms apply in call order.
    #[must_use]
    pub fn order(mut self, ordering: Ordering<M>) -> Self {
        self.orders.push(ordering.term().clone());
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Builds the query and returns (SQL, parameters).
    #[must_use]
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let columns: Vec<String> = M::COLUMNS.iter().map(|c| quote(c)).collect();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), quote(M::TABLE));
        let mut params = Vec::new();
        where_sql(&self.conditions, &mut sql, &mut params);

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders: Vec<String> = self.orders.iter().map(OrderTerm::to_sql).collect();
            sql.push_str(&orders.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // OFFSET is only valid after a LIMIT; -1 means unbounded.
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        (sql, params)
    }

    /// Builds `SELECT COUNT(*)` over the same conditions.
    #[must_use]
    pub fn count(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote(M::TABLE));
        let mut params = Vec::new();
        where_sql(&self.conditions, &mut sql, &mut params);
        (sql, params)
    }

    /// Builds the query and returns only the SQL string.
    #[must_use]
    pub fn build_sql(&self) -> String {
        self.build().0
    }
}

impl<M: Model> Default for Selector<M> {
    fn default() -> Self {
        Self::new()
    }
}
