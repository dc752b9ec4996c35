//! Dialect-specific DDL rendering.
//!
//! Every method renders from a descriptor alone; nothing here depends on
//! map iteration order, the clock or the environment, so the same descriptor
//! always yields byte-identical text.

use crate::descriptor::{Association, Collate, ColumnDescriptor, StorageType, TableDescriptor};

/// Trait for dialect-specific DDL generation.
pub trait SchemaDialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier, doubling embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Maps a storage class to the dialect's type name.
    fn storage_type(&self, storage_type: StorageType) -> &'static str {
        storage_type.as_sql()
    }

    /// Generates one column definition.
    ///
    /// Clause order is fixed: type, primary key, NOT NULL, UNIQUE, DEFAULT,
    /// COLLATE, REFERENCES.
    fn column_definition(&self, col: &ColumnDescriptor, association: Option<&Association>) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&col.name),
            self.storage_type(col.storage_type)
        );

        if col.primary_key {
            sql.push_str(" PRIMARY KEY");
            push_on_conflict(&mut sql, col);
            if col.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        } else {
            if !col.nullable {
                sql.push_str(" NOT NULL");
                if !col.unique {
                    push_on_conflict(&mut sql, col);
                }
            }
            if col.unique {
                sql.push_str(" UNIQUE");
                push_on_conflict(&mut sql, col);
            }
        }

        if let Some(ref default) = col.default_expr {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }

        if col.collate != Collate::Binary {
            sql.push_str(" COLLATE ");
            sql.push_str(col.collate.as_sql());
        }

        if let Some(fk) = association {
            sql.push_str(" REFERENCES ");
            sql.push_str(&self.quote_identifier(&fk.target_table));
            if let Some(action) = fk.on_delete {
                sql.push_str(" ON DELETE ");
                sql.push_str(action.as_sql());
            }
        }

        sql
    }

    /// Generates `CREATE TABLE IF NOT EXISTS` with columns in declaration order.
    fn create_table(&self, table: &TableDescriptor) -> String {
        let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
        sql.push_str(&self.quote_identifier(&table.name));
        sql.push_str(" (\n");

        let column_defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| {
                let association = table.associations.iter().find(|a| a.column == c.name);
                format!("    {}", self.column_definition(c, association))
            })
            .collect();
        sql.push_str(&column_defs.join(",\n"));

        sql.push_str("\n)");
        sql
    }

    /// Generates `CREATE [UNIQUE] INDEX IF NOT EXISTS` for one column.
    fn create_index(&self, table: &str, col: &ColumnDescriptor) -> String {
        let mut sql = String::from("CREATE ");
        if col.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX IF NOT EXISTS ");
        sql.push_str(&self.quote_identifier(&col.index_name(table)));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(table));
        sql.push_str(" (");
        sql.push_str(&self.quote_identifier(&col.name));
        sql.push(')');
        sql
    }

    /// Generates `DROP TABLE IF EXISTS`.
    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }
}

// Unique columns always carry an algorithm (ABORT when none was given).
fn push_on_conflict(sql: &mut String, col: &ColumnDescriptor) {
    if let Some(algorithm) = col.effective_on_conflict().as_sql() {
        sql.push_str(" ON CONFLICT ");
        sql.push_str(algorithm);
    }
}

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ForeignKeyAction, OnConflict};

    #[test]
    fn test_quote_identifier_escapes() {
        let d = SqliteDialect;
        assert_eq!(d.quote_identifier("users"), "\"users\"");
        assert_eq!(d.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_primary_key_clause() {
        let d = SqliteDialect;
        let mut id = ColumnDescriptor::new("id", StorageType::Integer).primary_key(true);
        assert_eq!(d.column_definition(&id, None), "\"id\" INTEGER PRIMARY KEY");

        id.autoincrement = true;
        id.on_conflict = OnConflict::Replace;
        assert_eq!(
            d.column_definition(&id, None),
            "\"id\" INTEGER PRIMARY KEY ON CONFLICT REPLACE AUTOINCREMENT"
        );
    }

    #[test]
    fn test_unique_defaults_to_abort() {
        let d = SqliteDialect;
        let name = ColumnDescriptor::new("name", StorageType::Text).unique();
        assert_eq!(
            d.column_definition(&name, None),
            "\"name\" TEXT NOT NULL UNIQUE ON CONFLICT ABORT"
        );
        let name = name.on_conflict(OnConflict::Ignore);
        assert_eq!(
            d.column_definition(&name, None),
            "\"name\" TEXT NOT NULL UNIQUE ON CONFLICT IGNORE"
        );
    }

    #[test]
    fn test_policy_without_uniqueness_lands_on_not_null() {
        let d = SqliteDialect;
        let col = ColumnDescriptor::new("n", StorageType::Integer).on_conflict(OnConflict::Fail);
        assert_eq!(d.column_definition(&col, None), "\"n\" INTEGER NOT NULL ON CONFLICT FAIL");
        let col = col.nullable();
        assert_eq!(d.column_definition(&col, None), "\"n\" INTEGER");
    }

    #[test]
    fn test_full_clause_order() {
        let d = SqliteDialect;
        let col = ColumnDescriptor::new("label", StorageType::Text)
            .unique()
            .default_expr("''")
            .collate(Collate::NoCase);
        let fk = Association {
            column: "label".to_string(),
            target_table: "Tag".to_string(),
            on_delete: Some(ForeignKeyAction::SetNull),
        };
        assert_eq!(
            d.column_definition(&col, Some(&fk)),
            "\"label\" TEXT NOT NULL UNIQUE ON CONFLICT ABORT DEFAULT '' COLLATE NOCASE \
             REFERENCES \"Tag\" ON DELETE SET NULL"
        );
    }

    #[test]
    fn test_create_index() {
        let d = SqliteDialect;
        let name = ColumnDescriptor::new("name", StorageType::Text).unique();
        assert_eq!(
            d.create_index("Category", &name),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"index_name_on_Category\" ON \"Category\" (\"name\")"
        );
        let rank = ColumnDescriptor::new("rank", StorageType::Integer).indexed();
        assert_eq!(
            d.create_index("Item", &rank),
            "CREATE INDEX IF NOT EXISTS \"index_rank_on_Item\" ON \"Item\" (\"rank\")"
        );
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(SqliteDialect.drop_table("Item"), "DROP TABLE IF EXISTS \"Item\"");
    }
}
