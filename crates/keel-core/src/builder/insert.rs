//! INSERT builder.

use std::marker::PhantomData;

use super::expr::quote;
use super::value::SqlValue;
use crate::descriptor::OnConflict;
use crate::model::Model;

/// Bound parameters allowed in one statement.
///
/// SQLite builds before 3.32 cap host parameters at 999; newer ones at 32766.
pub const MAX_BIND_PARAMETERS: usize = 999;

/// Inserts rows of `M`.
///
/// By default the engine-assigned key column is left out of the statement
/// (omit-auto-key mode) and no conflict algorithm is given.
pub struct Inserter<M> {
    on_conflict: OnConflict,
    omit_auto_key: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Inserter<M> {
    /// Creates an inserter with the default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_conflict: OnConflict::None,
            omit_auto_key: true,
            _model: PhantomData,
        }
    }

    /// Selects the conflict-resolution variant (`INSERT OR ...`).
    #[must_use]
    pub const fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Whether an auto-assigned key column is left out.
    #[must_use]
    pub const fn omit_auto_key(mut self, omit: bool) -> Self {
        self.omit_auto_key = omit;
        self
    }

    /// Ordinals of the columns written by this inserter.
    fn column_indexes(&self) -> Vec<usize> {
        let descriptor = M::descriptor();
        descriptor
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !(self.omit_auto_key && c.is_auto_key()))
            .map(|(i, _)| i)
            .collect()
    }

    fn statement(&self, columns: &[usize], rows: usize) -> String {
        let mut sql = String::from("INSERT ");
        if let Some(algorithm) = self.on_conflict.as_sql() {
            sql.push_str("OR ");
            sql.push_str(algorithm);
            sql.push(' ');
        }
        sql.push_str("INTO ");
        sql.push_str(&quote(M::TABLE));

        if columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
            return sql;
        }

        let names: Vec<String> = columns
            .iter()
            .filter_map(|&i| M::COLUMNS.get(i))
            .map(|c| quote(c))
            .collect();
        sql.push_str(" (");
        sql.push_str(&names.join(", "));
        sql.push_str(") VALUES ");

        let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        sql.push_str(&vec![placeholders.as_str(); rows].join(", "));
        sql
    }

    /// The single-row statement, without parameters.
    #[must_use]
    pub fn sql(&self) -> String {
        self.statement(&self.column_indexes(), 1)
    }

    /// Builds the insert of one model.
    #[must_use]
    pub fn build(&self, model: &M) -> (String, Vec<SqlValue>) {
        let columns = self.column_indexes();
        let sql = self.statement(&columns, 1);
        let values = model.to_values();
        let params = columns.iter().filter_map(|&i| values.get(i).cloned()).collect();
        (sql, params)
    }

    /// Builds one multi-row insert; `None` for an empty slice.
    ///
    /// Bulk inserts never target existing rows, so no key is required. The
    /// statement is not split: see [`Inserter::build_batches`] for input that
    /// may exceed [`MAX_BIND_PARAMETERS`].
    #[must_use]
    pub fn build_all(&self, models: &[M]) -> Option<(String, Vec<SqlValue>)> {
        if models.is_empty() {
            return None;
        }
        let columns = self.column_indexes();
        if columns.is_empty() {
            // DEFAULT VALUES cannot be repeated in one statement.
            return None;
        }
        Some(self.rows_statement(&columns, models))
    }

    /// Rows that fit in one statement under [`MAX_BIND_PARAMETERS`].
    #[must_use]
    pub fn rows_per_statement(&self) -> usize {
        (MAX_BIND_PARAMETERS / self.column_indexes().len().max(1)).max(1)
    }

    /// Builds multi-row inserts of at most [`Inserter::rows_per_statement`]
    /// rows each, in input order.
    ///
    /// Empty for an empty slice, and for tables whose only column is an
    /// omitted auto key (insert those one by one with [`Inserter::build`]).
    #[must_use]
    pub fn build_batches(&self, models: &[M]) -> Vec<(String, Vec<SqlValue>)> {
        let columns = self.column_indexes();
        if columns.is_empty() {
            return Vec::new();
        }
        models
            .chunks(self.rows_per_statement())
            .map(|chunk| self.rows_statement(&columns, chunk))
            .collect()
    }

    fn rows_statement(&self, columns: &[usize], models: &[M]) -> (String, Vec<SqlValue>) {
        let sql = self.statement(columns, models.len());
        let mut params = Vec::with_capacity(columns.len() * models.len());
        for model in models {
            let values = model.to_values();
            params.extend(columns.iter().filter_map(|&i| values.get(i).cloned()));
        }
        (sql, params)
    }
}

impl<M: Model> Default for Inserter<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{Item, Log};

    fn lamp() -> Item {
        Item {
            id: 7,
            name: "lamp".to_string(),
            rank: None,
        }
    }

    #[test]
    fn test_insert_omits_auto_key() {
        let (sql, params) = Inserter::<Item>::new().build(&lamp());
        assert_eq!(sql, "INSERT INTO \"Item\" (\"name\", \"rank\") VALUES (?, ?)");
        assert_eq!(params, vec![SqlValue::Text("lamp".into()), SqlValue::Null]);
    }

    #[test]
    fn test_insert_with_key() {
        let (sql, params) = Inserter::<Item>::new().omit_auto_key(false).build(&lamp());
        assert_eq!(sql, "INSERT INTO \"Item\" (\"id\", \"name\", \"rank\") VALUES (?, ?, ?)");
        assert_eq!(params[0], SqlValue::Integer(7));
    }

    #[test]
    fn test_conflict_variants() {
        for on_conflict in OnConflict::ALL {
            let sql = Inserter::<Item>::new().on_conflict(on_conflict).sql();
            match on_conflict.as_sql() {
                None => assert!(sql.starts_with("INSERT INTO ")),
                Some(keyword) => assert!(sql.starts_with(&format!("INSERT OR {keyword} INTO "))),
            }
        }
    }

    #[test]
    fn test_bulk_insert() {
        let rows = vec![lamp(), Item { rank: Some(2), ..lamp() }];
        let (sql, params) = Inserter::<Item>::new().build_all(&rows).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"Item\" (\"name\", \"rank\") VALUES (?, ?), (?, ?)"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[3], SqlValue::Integer(2));
        assert!(Inserter::<Item>::new().build_all(&[]).is_none());
    }

    #[test]
    fn test_bulk_insert_split_under_parameter_limit() {
        let inserter = Inserter::<Item>::new();
        assert_eq!(inserter.rows_per_statement(), 499);

        let rows: Vec<Item> = (0..1200).map(|id| Item { id, ..lamp() }).collect();
        let batches = inserter.build_batches(&rows);
        assert_eq!(batches.len(), 3);
        let sizes: Vec<usize> = batches.iter().map(|(_, params)| params.len() / 2).collect();
        assert_eq!(sizes, vec![499, 499, 202]);
        assert!(batches
            .iter()
            .all(|(sql, params)| params.len() <= MAX_BIND_PARAMETERS
                && sql.matches('?').count() == params.len()));
        assert!(inserter.build_batches(&[]).is_empty());
    }

    #[test]
    fn test_rowid_table_inserts_every_column() {
        let (sql, _) = Inserter::<Log>::new().build(&Log {
            message: "hi".to_string(),
        });
        assert_eq!(sql, "INSERT INTO \"Log\" (\"message\") VALUES (?)");
    }
}
