//! Model descriptor extraction.
//!
//! Turns one [`ModelDeclaration`] into a [`TableDescriptor`]. Extraction is
//! pure and accumulates every problem of the model before giving up, so a
//! user sees all malformed annotations in one pass.

use crate::declaration::{non_empty, ColumnAnnotation, FieldDeclaration, ModelDeclaration};
use crate::descriptor::{
    split_option, Association, Collate, ColumnDescriptor, ForeignKeyAction, Helpers, OnConflict,
    StorageType, TableDescriptor, AUTO_HELPERS,
};
use crate::error::ExtractionError;

/// Extracts the descriptor of one model.
///
/// Fields without a `column` or `primary_key` annotation are skipped. Absent
/// or empty annotation values take their defaults: the field name for the
/// column name, `NONE` for the conflict algorithm, `BINARY` for the
/// collation and `auto` for the helper set.
///
/// # Errors
///
/// Returns every [`ExtractionError`] found in the model, in field order.
pub fn extract(declaration: &ModelDeclaration) -> Result<TableDescriptor, Vec<ExtractionError>> {
    let mut table = TableDescriptor::new(declaration.table_name());
    table.model.clone_from(&declaration.name);

    let mut errors = Vec::new();
    for field in declaration.fields.iter().filter(|f| f.is_mapped()) {
        let mut ctx = FieldContext {
            model: &declaration.name,
            field,
            errors: &mut errors,
        };
        if let Some((column, association)) = ctx.extract() {
            table.columns.push(column);
            table.associations.extend(association);
        }
    }

    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}

struct FieldContext<'a> {
    model: &'a str,
    field: &'a FieldDeclaration,
    errors: &'a mut Vec<ExtractionError>,
}

impl FieldContext<'_> {
    fn extract(&mut self) -> Option<(ColumnDescriptor, Option<Association>)> {
        let field = self.field;
        let default_annotation = ColumnAnnotation::default();
        let annotation = field.column.as_ref().unwrap_or(&default_annotation);
        let key = field.primary_key.as_ref();
        let errors_before = self.errors.len();

        let name = non_empty(annotation.name.as_deref())
            .unwrap_or(&field.name)
            .to_string();
        let rust_type: String = field
            .rust_type
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let (nullable, inner) = split_option(&rust_type);
        let storage_type = self.storage_type(annotation, inner);

        // A key annotation's own algorithm wins over the column's.
        let on_conflict = key
            .and_then(|k| non_empty(k.on_conflict.as_deref()))
            .or_else(|| non_empty(annotation.on_conflict.as_deref()))
            .map_or(Some(OnConflict::None), |raw| {
                self.parse(raw, OnConflict::parse, |model, field, value| {
                    ExtractionError::InvalidOnConflict { model, field, value }
                })
            });
        let collate = non_empty(annotation.collate.as_deref()).map_or(Some(Collate::Binary), |raw| {
            self.parse(raw, Collate::parse, |model, field, value| {
                ExtractionError::InvalidCollate { model, field, value }
            })
        });
        let on_delete = non_empty(annotation.on_delete.as_deref()).and_then(|raw| {
            self.parse(raw, ForeignKeyAction::parse, |model, field, value| {
                ExtractionError::InvalidForeignKeyAction { model, field, value }
            })
        });
        let references = non_empty(annotation.references.as_deref());

        if let Some(key) = key {
            if nullable {
                self.conflict("a primary key cannot be an `Option`");
            }
            if key.autoincrement && storage_type.is_some_and(|s| s != StorageType::Integer) {
                self.conflict("`autoincrement` requires an INTEGER primary key");
            }
            if references.is_some() {
                self.conflict("a primary key cannot reference another table");
            }
        }
        if references.is_none() && non_empty(annotation.on_delete.as_deref()).is_some() {
            self.conflict("`on_delete` requires `references`");
        }

        // Helper names are checked even when the storage class is unknown.
        let helpers = self.helpers(
            annotation.helpers.as_deref(),
            storage_type.unwrap_or(StorageType::Blob),
            nullable,
        );
        let storage_type = storage_type?;

        if self.errors.len() > errors_before {
            return None;
        }
        let (on_conflict, collate, helpers) = (on_conflict?, collate?, helpers?);

        let column = ColumnDescriptor {
            field: field.name.clone(),
            rust_type: rust_type.clone(),
            storage_type,
            nullable,
            primary_key: key.is_some(),
            auto: key.is_some_and(|k| k.auto),
            autoincrement: key.is_some_and(|k| k.autoincrement),
            indexed: annotation.indexed,
            unique: annotation.unique,
            on_conflict,
            collate,
            default_expr: non_empty(annotation.default_expr.as_deref()).map(str::to_string),
            helpers,
            name,
        };
        let association = references.map(|target| Association {
            column: column.name.clone(),
            target_table: target.to_string(),
            on_delete,
        });
        Some((column, association))
    }

    fn storage_type(&mut self, annotation: &ColumnAnnotation, inner: &str) -> Option<StorageType> {
        match non_empty(annotation.storage_type.as_deref()) {
            Some(raw) => self.parse(raw, StorageType::parse, |model, field, value| {
                ExtractionError::InvalidStorageType { model, field, value }
            }),
            None => {
                let inferred = StorageType::infer(inner);
                if inferred.is_none() {
                    self.errors.push(ExtractionError::UnsupportedFieldType {
                        model: self.model.to_string(),
                        field: self.field.name.clone(),
                        rust_type: self.field.rust_type.clone(),
                    });
                }
                inferred
            }
        }
    }

    fn helpers(
        &mut self,
        names: Option<&[String]>,
        storage_type: StorageType,
        nullable: bool,
    ) -> Option<Helpers> {
        let names: Vec<&str> = names
            .unwrap_or_default()
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        let wants_auto = names.iter().any(|n| n.eq_ignore_ascii_case(AUTO_HELPERS));
        if names.is_empty() || (wants_auto && names.len() == 1) {
            return Some(Helpers::automatic(storage_type, nullable));
        }
        if wants_auto {
            self.conflict("`auto` helpers cannot be combined with explicit helper names");
            return None;
        }

        let mut helpers = Helpers::empty();
        let mut ok = true;
        for name in names {
            match Helpers::parse(name) {
                Some(flag) => helpers |= flag,
                None => {
                    ok = false;
                    self.errors.push(ExtractionError::UnknownHelper {
                        model: self.model.to_string(),
                        field: self.field.name.clone(),
                        value: name.to_string(),
                    });
                }
            }
        }
        ok.then_some(helpers)
    }

    fn parse<T>(
        &mut self,
        raw: &str,
        parse: impl FnOnce(&str) -> Option<T>,
        error: impl FnOnce(String, String, String) -> ExtractionError,
    ) -> Option<T> {
        let parsed = parse(raw);
        if parsed.is_none() {
            self.errors.push(error(
                self.model.to_string(),
                self.field.name.clone(),
                raw.to_string(),
            ));
        }
        parsed
    }

    fn conflict(&mut self, reason: &str) {
        self.errors.push(ExtractionError::ConflictingAnnotations {
            model: self.model.to_string(),
            field: self.field.name.clone(),
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::PrimaryKeyAnnotation;

    fn column(name: &str, rust_type: &str, annotation: ColumnAnnotation) -> FieldDeclaration {
        FieldDeclaration::column(name, rust_type, annotation)
    }

    #[test]
    fn test_defaults() {
        let decl = ModelDeclaration::new("Todo")
            .field(FieldDeclaration::primary_key("id", "i64"))
            .field(column("title", "String", ColumnAnnotation::default()))
            .field(column("note", "Option<String>", ColumnAnnotation::default()))
            .field(FieldDeclaration::plain("cache", "Vec<String>"));

        let table = extract(&decl).unwrap();
        assert_eq!(table.name, "Todo");
        assert_eq!(table.model, "Todo");
        assert_eq!(table.column_names(), vec!["id", "title", "note"]);

        let id = &table.columns[0];
        assert!(id.primary_key && id.auto && !id.autoincrement);
        assert_eq!(id.storage_type, StorageType::Integer);

        let title = &table.columns[1];
        assert!(!title.nullable);
        assert_eq!(title.on_conflict, OnConflict::None);
        assert_eq!(title.collate, Collate::Binary);
        assert_eq!(title.helpers, Helpers::automatic(StorageType::Text, false));

        let note = &table.columns[2];
        assert!(note.nullable);
        assert!(note.helpers.contains(Helpers::IS_NULL));
    }

    #[test]
    fn test_overrides() {
        let decl = ModelDeclaration::new("Item").table("items").field(column(
            "category_id",
            "i64",
            ColumnAnnotation {
                name: Some("categoryId".to_string()),
                indexed: true,
                on_conflict: Some("replace".to_string()),
                collate: Some("nocase".to_string()),
                default_expr: Some("0".to_string()),
                storage_type: Some("text".to_string()),
                helpers: Some(vec!["eq".to_string(), "in_list".to_string()]),
                references: Some("Category".to_string()),
                on_delete: Some("cascade".to_string()),
                ..ColumnAnnotation::default()
            },
        ));

        let table = extract(&decl).unwrap();
        assert_eq!(table.name, "items");
        let col = &table.columns[0];
        assert_eq!(col.name, "categoryId");
        assert_eq!(col.field, "category_id");
        assert_eq!(col.storage_type, StorageType::Text);
        assert_eq!(col.on_conflict, OnConflict::Replace);
        assert_eq!(col.collate, Collate::NoCase);
        assert_eq!(col.default_expr.as_deref(), Some("0"));
        assert_eq!(col.helpers, Helpers::EQ | Helpers::IN);
        assert_eq!(
            table.associations,
            vec![Association {
                column: "categoryId".to_string(),
                target_table: "Category".to_string(),
                on_delete: Some(ForeignKeyAction::Cascade),
            }]
        );
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let decl = ModelDeclaration::new("M").field(column(
            "value",
            "f64",
            ColumnAnnotation {
                name: Some(String::new()),
                on_conflict: Some(String::new()),
                collate: Some("  ".to_string()),
                helpers: Some(vec![]),
                ..ColumnAnnotation::default()
            },
        ));
        let col = &extract(&decl).unwrap().columns[0];
        assert_eq!(col.name, "value");
        assert_eq!(col.on_conflict, OnConflict::None);
        assert_eq!(col.collate, Collate::Binary);
        assert_eq!(col.helpers, Helpers::automatic(StorageType::Real, false));
    }

    #[test]
    fn test_errors_accumulate_across_fields() {
        let decl = ModelDeclaration::new("Broken")
            .field(column("when", "DateTime<Utc>", ColumnAnnotation::default()))
            .field(column(
                "name",
                "String",
                ColumnAnnotation {
                    collate: Some("upper".to_string()),
                    on_conflict: Some("explode".to_string()),
                    helpers: Some(vec!["like".to_string()]),
                    ..ColumnAnnotation::default()
                },
            ))
            .field(column(
                "payload",
                "Vec<u8>",
                ColumnAnnotation {
                    storage_type: Some("JSON".to_string()),
                    ..ColumnAnnotation::default()
                },
            ));

        let errors = extract(&decl).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ExtractionError::UnsupportedFieldType { .. }));
        assert!(matches!(errors[1], ExtractionError::InvalidOnConflict { .. }));
        assert!(matches!(errors[2], ExtractionError::InvalidCollate { .. }));
        assert!(matches!(errors[3], ExtractionError::UnknownHelper { .. }));
        assert!(matches!(errors[4], ExtractionError::InvalidStorageType { .. }));
        assert_eq!(errors[4].field(), "payload");
    }

    #[test]
    fn test_unknown_helper_reported_with_unsupported_type() {
        let decl = ModelDeclaration::new("Event").field(column(
            "at",
            "Instant",
            ColumnAnnotation {
                helpers: Some(vec!["eq".to_string(), "like".to_string()]),
                ..ColumnAnnotation::default()
            },
        ));
        let errors = extract(&decl).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ExtractionError::UnsupportedFieldType { .. }));
        assert!(
            matches!(&errors[1], ExtractionError::UnknownHelper { value, .. } if value == "like")
        );
    }

    #[test]
    fn test_conflicting_key_annotations() {
        let decl = ModelDeclaration::new("K").field(FieldDeclaration {
            name: "id".to_string(),
            rust_type: "Option<String>".to_string(),
            column: Some(ColumnAnnotation {
                references: Some("Other".to_string()),
                ..ColumnAnnotation::default()
            }),
            primary_key: Some(PrimaryKeyAnnotation {
                auto: false,
                autoincrement: true,
                on_conflict: None,
            }),
        });
        let errors = extract(&decl).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ExtractionError::ConflictingAnnotations { .. })));
    }

    #[test]
    fn test_auto_mixed_with_explicit_helpers() {
        let decl = ModelDeclaration::new("H").field(column(
            "n",
            "i32",
            ColumnAnnotation {
                helpers: Some(vec!["auto".to_string(), "eq".to_string()]),
                ..ColumnAnnotation::default()
            },
        ));
        let errors = extract(&decl).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("`auto`"));
    }

    #[test]
    fn test_key_conflict_policy_wins() {
        let decl = ModelDeclaration::new("P").field(FieldDeclaration {
            name: "id".to_string(),
            rust_type: "i64".to_string(),
            column: Some(ColumnAnnotation {
                on_conflict: Some("ignore".to_string()),
                ..ColumnAnnotation::default()
            }),
            primary_key: Some(PrimaryKeyAnnotation {
                on_conflict: Some("replace".to_string()),
                ..PrimaryKeyAnnotation::default()
            }),
        });
        assert_eq!(extract(&decl).unwrap().columns[0].on_conflict, OnConflict::Replace);
    }

    #[test]
    fn test_extraction_is_pure() {
        let decl = ModelDeclaration::new("Same")
            .field(FieldDeclaration::primary_key("id", "i64"))
            .field(column("name", "String", ColumnAnnotation::default()));
        assert_eq!(extract(&decl), extract(&decl));
    }
}
