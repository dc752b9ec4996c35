//! Model declarations: the raw, annotation-level description of a model.
//!
//! A declaration is what the derive macro reads off a struct, or what a
//! schema-description file contains. Every annotation value is kept as the
//! text the user wrote; the extractor is the only place that interprets it.
//!
//! ```rust
//! use keel_core::declaration::{ColumnAnnotation, FieldDeclaration, ModelDeclaration};
//!
//! let category = ModelDeclaration::new("Category")
//!     .field(FieldDeclaration::primary_key("id", "i64"))
//!     .field(FieldDeclaration::column("name", "String", ColumnAnnotation {
//!         unique: true,
//!         ..ColumnAnnotation::default()
//!     }));
//!
//! assert_eq!(category.fields.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

/// Options of a `column` annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnAnnotation {
    /// Column name; empty or absent means the field name.
    pub name: Option<String>,
    /// Create a plain index.
    pub indexed: bool,
    /// Add a UNIQUE constraint and index.
    pub unique: bool,
    /// Conflict algorithm: `none`, `rollback`, `abort`, `fail`, `ignore`, `replace`.
    pub on_conflict: Option<String>,
    /// Collation: `binary`, `nocase`, `rtrim`.
    pub collate: Option<String>,
    /// Literal SQL default expression.
    pub default_expr: Option<String>,
    /// Storage type override: `INTEGER`, `TEXT`, `REAL`, `BLOB`.
    pub storage_type: Option<String>,
    /// Helper names; absent means `auto`.
    pub helpers: Option<Vec<String>>,
    /// Name of the referenced table.
    pub references: Option<String>,
    /// Referential action on delete.
    pub on_delete: Option<String>,
}

/// Options of a `primary_key` annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimaryKeyAnnotation {
    /// The engine assigns the key when an insert omits it.
    pub auto: bool,
    /// Never reuse keys of deleted rows.
    pub autoincrement: bool,
    /// Conflict algorithm of the PRIMARY KEY constraint.
    pub on_conflict: Option<String>,
}

impl Default for PrimaryKeyAnnotation {
    fn default() -> Self {
        Self {
            auto: true,
            autoincrement: false,
            on_conflict: None,
        }
    }
}

/// One field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    /// Field name.
    pub name: String,
    /// Declared Rust type, e.g. `Option<String>`.
    pub rust_type: String,
    /// The `column` annotation, if present.
    #[serde(default)]
    pub column: Option<ColumnAnnotation>,
    /// The `primary_key` annotation, if present.
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyAnnotation>,
}

impl FieldDeclaration {
    /// A field without annotations; it is not mapped.
    #[must_use]
    pub fn plain(name: impl Into<String>, rust_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rust_type: rust_type.into(),
            column: None,
            primary_key: None,
        }
    }

    /// A field carrying a `column` annotation.
    #[must_use]
    pub fn column(
        name: impl Into<String>,
        rust_type: impl Into<String>,
        column: ColumnAnnotation,
    ) -> Self {
        Self {
            column: Some(column),
            ..Self::plain(name, rust_type)
        }
    }

    /// A field carrying a default `primary_key` annotation.
    #[must_use]
    pub fn primary_key(name: impl Into<String>, rust_type: impl Into<String>) -> Self {
        Self {
            primary_key: Some(PrimaryKeyAnnotation::default()),
            ..Self::plain(name, rust_type)
        }
    }

    /// Whether the field is mapped to a column.
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        self.column.is_some() || self.primary_key.is_some()
    }
}

/// One model: a type-level name plus its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDeclaration {
    /// Declared type name.
    pub name: String,
    /// Table name override.
    #[serde(default)]
    pub table: Option<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
}

impl ModelDeclaration {
    /// Creates a declaration without fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Overrides the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    /// Parses one declaration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or unknown keys.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parses a JSON array of declarations.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or unknown keys.
    pub fn list_from_json(json: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(json)
    }

    /// The table name this declaration maps to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        non_empty(self.table.as_deref()).unwrap_or(&self.name)
    }
}

/// Treats an empty annotation string like an absent one.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_defaults_to_model_name() {
        assert_eq!(ModelDeclaration::new("Todo").table_name(), "Todo");
        assert_eq!(ModelDeclaration::new("Todo").table("todos").table_name(), "todos");
        assert_eq!(ModelDeclaration::new("Todo").table("").table_name(), "Todo");
    }

    #[test]
    fn test_from_json_with_defaults() {
        let json = r#"{
            "name": "Item",
            "fields": [
                { "name": "id", "rust_type": "i64", "primary_key": {} },
                { "name": "category_id", "rust_type": "i64",
                  "column": { "references": "Category", "on_delete": "cascade" } },
                { "name": "cache", "rust_type": "String" }
            ]
        }"#;
        let decl = ModelDeclaration::from_json(json).unwrap();
        assert_eq!(decl.name, "Item");
        assert_eq!(decl.fields.len(), 3);
        assert_eq!(decl.fields[0].primary_key, Some(PrimaryKeyAnnotation::default()));
        assert!(decl.fields[0].primary_key.as_ref().unwrap().auto);
        assert_eq!(
            decl.fields[1].column.as_ref().unwrap().references.as_deref(),
            Some("Category")
        );
        assert!(!decl.fields[2].is_mapped());
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        let json = r#"{ "name": "Item", "fields": [], "colour": "red" }"#;
        assert!(ModelDeclaration::from_json(json).is_err());
    }

    #[test]
    fn test_list_from_json() {
        let json = r#"[{ "name": "A" }, { "name": "B", "table": "bees" }]"#;
        let decls = ModelDeclaration::list_from_json(json).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].table_name(), "bees");
    }
}
