//! Condition and ordering expressions.

use core::fmt;
use std::marker::PhantomData;

use super::value::SqlValue;
use crate::descriptor::Helpers;

/// Quotes a column or table identifier for use in builder SQL.
#[must_use]
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A comparison operation a column may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `BETWEEN ? AND ?`
    Between,
}

impl ConditionOp {
    /// All operations, in helper-bit order.
    pub const ALL: [Self; 11] = [
        Self::Eq,
        Self::NotEq,
        Self::IsNull,
        Self::IsNotNull,
        Self::In,
        Self::NotIn,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Between,
    ];

    /// The helper bit gating this operation.
    #[must_use]
    pub const fn helper(self) -> Helpers {
        match self {
            Self::Eq => Helpers::EQ,
            Self::NotEq => Helpers::NOT_EQ,
            Self::IsNull => Helpers::IS_NULL,
            Self::IsNotNull => Helpers::IS_NOT_NULL,
            Self::In => Helpers::IN,
            Self::NotIn => Helpers::NOT_IN,
            Self::Lt => Helpers::LT,
            Self::Le => Helpers::LE,
            Self::Gt => Helpers::GT,
            Self::Ge => Helpers::GE,
            Self::Between => Helpers::BETWEEN,
        }
    }

    /// Exact number of operands, `None` for the list operations.
    #[must_use]
    pub const fn arity(self) -> Option<usize> {
        match self {
            Self::IsNull | Self::IsNotNull => Some(0),
            Self::In | Self::NotIn => None,
            Self::Between => Some(2),
            _ => Some(1),
        }
    }

    /// The declaration name of the helper.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::NotEq => "not_eq",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::In => "in_list",
            Self::NotIn => "not_in_list",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Between => "between",
        }
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// The helper bit gating this direction.
    #[must_use]
    pub const fn helper(self) -> Helpers {
        match self {
            Self::Asc => Helpers::ORDER_ASC,
            Self::Desc => Helpers::ORDER_DESC,
        }
    }

    /// The declaration name of the helper.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Asc => "order_asc",
            Self::Desc => "order_desc",
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An untyped, parameterized SQL condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    sql: String,
    params: Vec<SqlValue>,
}

impl Expr {
    /// Renders `column <op> operands`. The operand count is not checked here.
    #[must_use]
    pub fn compare(column: &str, op: ConditionOp, mut values: Vec<SqlValue>) -> Self {
        let column = quote(column);
        let sql = match op {
            ConditionOp::Eq => format!("{column} = ?"),
            ConditionOp::NotEq => format!("{column} <> ?"),
            ConditionOp::IsNull => format!("{column} IS NULL"),
            ConditionOp::IsNotNull => format!("{column} IS NOT NULL"),
            ConditionOp::In | ConditionOp::NotIn => {
                let keyword = if op == ConditionOp::In { "IN" } else { "NOT IN" };
                let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                format!("{column} {keyword} ({})", placeholders.join(", "))
            }
            ConditionOp::Lt => format!("{column} < ?"),
            ConditionOp::Le => format!("{column} <= ?"),
            ConditionOp::Gt => format!("{column} > ?"),
            ConditionOp::Ge => format!("{column} >= ?"),
            ConditionOp::Between => format!("{column} BETWEEN ? AND ?"),
        };
        if op.arity() == Some(0) {
            values.clear();
        }
        Self { sql, params: values }
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::join(self, "AND", other)
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::join(self, "OR", other)
    }

    fn join(left: Self, op: &str, right: Self) -> Self {
        let mut params = left.params;
        params.extend(right.params);
        Self {
            sql: format!("({} {op} {})", left.sql, right.sql),
            params,
        }
    }

    /// The SQL text with `?` placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Splits into SQL text and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Column name.
    pub column: String,
    /// Direction.
    pub direction: OrderDirection,
}

impl OrderTerm {
    /// Renders the term.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{} {}", quote(&self.column), self.direction.as_sql())
    }
}

/// A condition on the rows of model `M`.
///
/// Only obtainable through the capability traits of `M`'s columns (or from
/// a checked [`Expr`]), so a condition always names a column of `M` with the
/// operation enabled.
pub struct Condition<M> {
    expr: Expr,
    _model: PhantomData<fn() -> M>,
}

impl<M> Condition<M> {
    pub(crate) const fn new(expr: Expr) -> Self {
        Self {
            expr,
            _model: PhantomData,
        }
    }

    /// Both conditions must hold.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(self.expr.and(other.expr))
    }

    /// Either condition must hold.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::new(self.expr.or(other.expr))
    }

    /// The untyped expression.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Consumes the condition into its untyped expression.
    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<M> Clone for Condition<M> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<M> fmt::Debug for Condition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.expr).finish()
    }
}

/// An ordering on the rows of model `M`.
pub struct Ordering<M> {
    term: OrderTerm,
    _model: PhantomData<fn() -> M>,
}

impl<M> Ordering<M> {
    pub(crate) fn new(column: &str, direction: OrderDirection) -> Self {
        Self {
            term: OrderTerm {
                column: column.to_string(),
                direction,
            },
            _model: PhantomData,
        }
    }

    /// The untyped term.
    #[must_use]
    pub const fn term(&self) -> &OrderTerm {
        &self.term
    }
}

impl<M> Clone for Ordering<M> {
    fn clone(&self) -> Self {
        Self {
            term: self.term.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Ordering<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ordering").field(&self.term).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_rendering() {
        let e = Expr::compare("name", ConditionOp::Eq, vec![SqlValue::Text("a".into())]);
        assert_eq!(e.sql(), "\"name\" = ?");
        assert_eq!(e.params().len(), 1);

        let e = Expr::compare("n", ConditionOp::In, vec![SqlValue::Integer(1), SqlValue::Integer(2)]);
        assert_eq!(e.sql(), "\"n\" IN (?, ?)");

        let e = Expr::compare("n", ConditionOp::Between, vec![SqlValue::Integer(1), SqlValue::Integer(9)]);
        assert_eq!(e.sql(), "\"n\" BETWEEN ? AND ?");

        let e = Expr::compare("n", ConditionOp::IsNotNull, vec![SqlValue::Null]);
        assert_eq!(e.sql(), "\"n\" IS NOT NULL");
        assert!(e.params().is_empty());
    }

    #[test]
    fn test_and_or_parenthesize() {
        let a = Expr::compare("a", ConditionOp::Lt, vec![SqlValue::Integer(1)]);
        let b = Expr::compare("b", ConditionOp::Gt, vec![SqlValue::Integer(2)]);
        let c = Expr::compare("c", ConditionOp::IsNull, vec![]);
        let (sql, params) = a.or(b).and(c).into_parts();
        assert_eq!(sql, "((\"a\" < ? OR \"b\" > ?) AND \"c\" IS NULL)");
        assert_eq!(params, vec![SqlValue::Integer(1), SqlValue::Integer(2)]);
    }

    #[test]
    fn test_ops_cover_every_condition_bit() {
        let all = ConditionOp::ALL
            .iter()
            .fold(Helpers::empty(), |acc, op| acc | op.helper());
        assert_eq!(all, Helpers::CONDITIONS);
        for op in ConditionOp::ALL {
            assert_eq!(Helpers::parse(op.name()), Some(op.helper()));
        }
    }

    #[test]
    fn test_order_term() {
        let term = OrderTerm {
            column: "rank".to_string(),
            direction: OrderDirection::Desc,
        };
        assert_eq!(term.to_sql(), "\"rank\" DESC");
        assert_eq!(Helpers::parse(OrderDirection::Asc.name()), Some(Helpers::ORDER_ASC));
    }
}
