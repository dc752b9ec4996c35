//! Error types for extraction, validation and compilation.

use core::fmt;

use thiserror::Error;

/// A malformed or contradictory annotation on one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The field type has no storage mapping and no explicit override.
    #[error("Unsupported field type `{rust_type}` for {model}.{field}; set `storage_type` explicitly")]
    UnsupportedFieldType {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Declared Rust type.
        rust_type: String,
    },

    /// The storage type override is not one of INTEGER, TEXT, REAL, BLOB.
    #[error("Invalid storage type \"{value}\" for {model}.{field}")]
    InvalidStorageType {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// The conflict constant cannot be parsed.
    #[error("Invalid on_conflict \"{value}\" for {model}.{field}")]
    InvalidOnConflict {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// The collation cannot be parsed.
    #[error("Invalid collate \"{value}\" for {model}.{field}")]
    InvalidCollate {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// A helper name is not recognised.
    #[error("Unknown helper \"{value}\" for {model}.{field}")]
    UnknownHelper {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// The referential action cannot be parsed.
    #[error("Invalid on_delete \"{value}\" for {model}.{field}")]
    InvalidForeignKeyAction {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// Two annotations on the same field contradict each other.
    #[error("Conflicting annotations on {model}.{field}: {reason}")]
    ConflictingAnnotations {
        /// Declaring model.
        model: String,
        /// Offending field.
        field: String,
        /// What contradicts what.
        reason: String,
    },
}

impl ExtractionError {
    /// The field the error is reported against.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::UnsupportedFieldType { field, .. }
            | Self::InvalidStorageType { field, .. }
            | Self::InvalidOnConflict { field, .. }
            | Self::InvalidCollate { field, .. }
            | Self::UnknownHelper { field, .. }
            | Self::InvalidForeignKeyAction { field, .. }
            | Self::ConflictingAnnotations { field, .. } => field,
        }
    }
}

/// A structural problem in one table or across tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two columns share a name, ignoring case. Reported once per column.
    #[error("Duplicate column names \"{name}\" found in {table} (field `{field}`)")]
    DuplicateColumnName {
        /// Table name.
        table: String,
        /// The duplicated name, lower-cased.
        name: String,
        /// The column reported by this diagnostic.
        column: String,
        /// The declaring field of that column.
        field: String,
    },

    /// A table has neither columns nor a primary key.
    #[error("No column nor primary key is defined in {table}")]
    NoColumnDefined {
        /// Table name.
        table: String,
    },

    /// More than one column is marked primary key.
    #[error("Multiple primary keys found in {table}: {}", .columns.join(", "))]
    MultiplePrimaryKeys {
        /// Table name.
        table: String,
        /// Every primary-key column.
        columns: Vec<String>,
    },

    /// Two tables share a name, ignoring case.
    #[error("Duplicate table names \"{name}\" found (model `{model}`)")]
    DuplicateTableName {
        /// The duplicated name, lower-cased.
        name: String,
        /// The model reported by this diagnostic.
        model: String,
    },

    /// An association targets a table outside the compilation set.
    #[error("{table}.{column} references unknown table {target}")]
    UnknownAssociationTarget {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Missing table.
        target: String,
    },

    /// An association targets a table without a declared primary key.
    ///
    /// The engine resolves `REFERENCES "t"` to the target's key column, and
    /// the implicit row id cannot be referenced.
    #[error("{table}.{column} references {target}, which has no primary key column")]
    AssociationTargetWithoutKey {
        /// Referencing table.
        table: String,
        /// Referencing column.
        column: String,
        /// Target table.
        target: String,
    },

    /// Two indexes, or an index and a table, share a name, ignoring case.
    #[error("Index name \"{index}\" of {table}.{column} collides with {other}")]
    DuplicateIndexName {
        /// The colliding index name.
        index: String,
        /// Table owning the index.
        table: String,
        /// Indexed column.
        column: String,
        /// The other index or table holding that name.
        other: String,
    },

    /// Associations form a cycle.
    #[error("Association cycle: {}", .path.join(" -> "))]
    AssociationCycle {
        /// Tables on the cycle; the first one is repeated at the end.
        path: Vec<String>,
    },
}

impl ValidationError {
    /// The table the error is reported against.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::DuplicateColumnName { table, .. }
            | Self::NoColumnDefined { table }
            | Self::MultiplePrimaryKeys { table, .. }
            | Self::UnknownAssociationTarget { table, .. }
            | Self::AssociationTargetWithoutKey { table, .. }
            | Self::DuplicateIndexName { table, .. } => table,
            Self::DuplicateTableName { model, .. } => model,
            Self::AssociationCycle { path } => path.first().map_or("", String::as_str),
        }
    }
}

/// An invariant the validator should have guaranteed does not hold.
///
/// Never a user error: seeing one means the validator has a gap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// An association names a column the table does not have.
    #[error("internal: association column {table}.{column} is not a column of the table")]
    DanglingAssociationColumn {
        /// Table name.
        table: String,
        /// Missing column.
        column: String,
    },

    /// A descriptor reached the compiler with a validation problem.
    #[error("internal: unvalidated descriptor reached the compiler: {0}")]
    Unvalidated(ValidationError),
}

/// Misuse of the dynamic query-builder surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The column does not expose the requested helper.
    #[error("helper `{helper}` is not enabled on {table}.{column}")]
    HelperNotEnabled {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Helper name.
        helper: &'static str,
    },

    /// No such column in the table.
    #[error("{table} has no column {column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// Wrong number of operands.
    #[error("`{helper}` takes {expected} operand(s), got {found}")]
    Arity {
        /// Helper name.
        helper: &'static str,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },

    /// A row cannot be targeted because its key is unknown.
    #[error("cannot target a row of {table}: no primary key value")]
    UnresolvableKey {
        /// Table name.
        table: String,
    },
}

/// One reportable problem found while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Per-field annotation problem.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Structural problem.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Validator gap.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}

/// Every diagnostic collected for one compilation unit.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds one diagnostic.
    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.0.push(diagnostic.into());
    }

    /// Adds many diagnostics.
    pub fn extend<D: Into<Diagnostic>>(&mut self, diagnostics: impl IntoIterator<Item = D>) {
        self.0.extend(diagnostics.into_iter().map(Into::into));
    }

    /// Returns `true` when nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the diagnostics in report order.
    pub fn iter(&self) -> core::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Hands every diagnostic to `sink`.
    pub fn emit_to(&self, sink: &mut impl crate::diagnostics::DiagnosticSink) {
        for diagnostic in &self.0 {
            sink.report(diagnostic);
        }
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collection itself when it holds at least one diagnostic.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema error(s):", self.0.len())?;
        for diagnostic in &self.0 {
            write!(f, "\n  - {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = core::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
