//! Schema compiler: descriptors to DDL text and a digest.

mod dialect;
mod digest;

pub use dialect::{SchemaDialect, SqliteDialect};
pub use digest::SchemaDigest;

use tracing::debug;

use crate::descriptor::TableDescriptor;
use crate::error::CompilationError;
use crate::validate::validate_table;

/// The DDL of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    /// Table name.
    pub table: String,
    /// `CREATE TABLE` statement.
    pub create_table: String,
    /// `CREATE INDEX` statements, in column declaration order.
    pub create_indexes: Vec<String>,
}

impl TableDdl {
    /// Every statement, table first.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.create_table.as_str()).chain(self.create_indexes.iter().map(String::as_str))
    }
}

/// Compiles one validated table.
///
/// # Errors
///
/// Fails only when the descriptor breaks an invariant the validator
/// guarantees. That is a defect, never a user error.
pub fn compile_table<D: SchemaDialect + ?Sized>(
    dialect: &D,
    table: &TableDescriptor,
) -> Result<TableDdl, CompilationError> {
    if let Some(err) = validate_table(table).into_iter().next() {
        return Err(CompilationError::Unvalidated(err));
    }
    if let Some(dangling) = table
        .associations
        .iter()
        .find(|a| !table.columns.iter().any(|c| c.name == a.column))
    {
        return Err(CompilationError::DanglingAssociationColumn {
            table: table.name.clone(),
            column: dangling.column.clone(),
        });
    }

    let create_table = dialect.create_table(table);
    let create_indexes: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.needs_index())
        .map(|c| dialect.create_index(&table.name, c))
        .collect();

    debug!(
        dialect = dialect.name(),
        table = %table.name,
        indexes = create_indexes.len(),
        "Compiled table"
    );

    Ok(TableDdl {
        table: table.name.clone(),
        create_table,
        create_indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Association, ColumnDescriptor, StorageType};

    fn category() -> TableDescriptor {
        TableDescriptor::new("Category")
            .column(ColumnDescriptor::new("id", StorageType::Integer).primary_key(true))
            .column(ColumnDescriptor::new("name", StorageType::Text).unique())
    }

    #[test]
    fn test_compile_category() {
        let ddl = compile_table(&SqliteDialect, &category()).unwrap();
        assert_eq!(
            ddl.create_table,
            "CREATE TABLE IF NOT EXISTS \"Category\" (\n    \
             \"id\" INTEGER PRIMARY KEY,\n    \
             \"name\" TEXT NOT NULL UNIQUE ON CONFLICT ABORT\n)"
        );
        assert_eq!(
            ddl.create_indexes,
            vec!["CREATE UNIQUE INDEX IF NOT EXISTS \"index_name_on_Category\" ON \"Category\" (\"name\")"]
        );
        assert_eq!(ddl.statements().count(), 2);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let a = compile_table(&SqliteDialect, &category()).unwrap();
        let b = compile_table(&SqliteDialect, &category()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unvalidated_descriptor_is_an_internal_error() {
        let err = compile_table(&SqliteDialect, &TableDescriptor::new("Empty")).unwrap_err();
        assert!(matches!(err, CompilationError::Unvalidated(_)));
        assert!(err.to_string().starts_with("internal:"));
    }

    #[test]
    fn test_dangling_association_column() {
        let table = category().association(Association {
            column: "missing".to_string(),
            target_table: "Other".to_string(),
            on_delete: None,
        });
        let err = compile_table(&SqliteDialect, &table).unwrap_err();
        assert_eq!(
            err,
            CompilationError::DanglingAssociationColumn {
                table: "Category".to_string(),
                column: "missing".to_string(),
            }
        );
    }
}
