//! Table and column descriptors.
//!
//! A descriptor is the canonical, in-memory form of one mapped model. It is
//! produced once by the extractor, checked by the validator, and then shared
//! read-only (behind an `Arc`) by the schema compiler, the query-builder
//! surface and the row materializer.

mod helpers;

use core::fmt;

pub use helpers::{Helpers, AUTO as AUTO_HELPERS};

/// Name of the engine's implicit row-id column.
pub const ROWID: &str = "_rowid_";

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// Signed integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// 8-byte floating point.
    Real,
    /// Raw bytes.
    Blob,
}

impl StorageType {
    /// Returns the SQL spelling of the storage class.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    /// Parses an explicit storage type override (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" => Some(Self::Integer),
            "TEXT" => Some(Self::Text),
            "REAL" => Some(Self::Real),
            "BLOB" => Some(Self::Blob),
            _ => None,
        }
    }

    /// Infers the storage type from a declared Rust type.
    ///
    /// The type must already have its `Option<..>` wrapper removed
    /// (see [`split_option`]).
    #[must_use]
    pub fn infer(rust_type: &str) -> Option<Self> {
        let ty: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();
        if ty == "Vec<u8>" || ty.ends_with("::Vec<u8>") {
            return Some(Self::Blob);
        }
        if ty.contains('<') {
            return None;
        }
        match ty.rsplit("::").next().unwrap_or(ty.as_str()) {
            "bool" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => Some(Self::Integer),
            "f32" | "f64" => Some(Self::Real),
            "String" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Splits a declared Rust type into `(nullable, inner type)`.
///
/// `Option<String>` yields `(true, "String")`, `i64` yields `(false, "i64")`.
#[must_use]
pub fn split_option(rust_type: &str) -> (bool, &str) {
    let ty = rust_type.trim();
    for prefix in [
        "Option<",
        "std::option::Option<",
        "core::option::Option<",
        "::std::option::Option<",
        "::core::option::Option<",
    ] {
        if let Some(inner) = ty.strip_prefix(prefix).and_then(|s| s.strip_suffix('>')) {
            return (true, inner.trim());
        }
    }
    (false, ty)
}

/// SQL conflict-resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnConflict {
    /// No explicit algorithm.
    #[default]
    None,
    /// `ROLLBACK`
    Rollback,
    /// `ABORT`
    Abort,
    /// `FAIL`
    Fail,
    /// `IGNORE`
    Ignore,
    /// `REPLACE`
    Replace,
}

impl OnConflict {
    /// All variants, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Rollback,
        Self::Abort,
        Self::Fail,
        Self::Ignore,
        Self::Replace,
    ];

    /// Returns the SQL keyword, or `None` for [`OnConflict::None`].
    #[must_use]
    pub const fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Rollback => Some("ROLLBACK"),
            Self::Abort => Some("ABORT"),
            Self::Fail => Some("FAIL"),
            Self::Ignore => Some("IGNORE"),
            Self::Replace => Some("REPLACE"),
        }
    }

    /// Parses a conflict constant (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "ROLLBACK" => Some(Self::Rollback),
            "ABORT" => Some(Self::Abort),
            "FAIL" => Some(Self::Fail),
            "IGNORE" => Some(Self::Ignore),
            "REPLACE" => Some(Self::Replace),
            _ => None,
        }
    }

    /// Returns the algorithm a constraint actually uses.
    ///
    /// A unique column without an explicit algorithm uses `ABORT`.
    #[must_use]
    pub const fn effective(self, unique: bool) -> Self {
        match self {
            Self::None if unique => Self::Abort,
            other => other,
        }
    }

    /// Returns `true` for [`OnConflict::None`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Collating sequence of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Collate {
    /// Byte-wise comparison (the engine default).
    #[default]
    Binary,
    /// ASCII case folding.
    NoCase,
    /// Trailing spaces ignored.
    RTrim,
}

impl Collate {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Binary => "BINARY",
            Self::NoCase => "NOCASE",
            Self::RTrim => "RTRIM",
        }
    }

    /// Parses a collation name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BINARY" => Some(Self::Binary),
            "NOCASE" => Some(Self::NoCase),
            "RTRIM" => Some(Self::RTrim),
            _ => None,
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses an action; spaces, dashes and underscores are interchangeable.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c.to_ascii_uppercase() })
            .collect();
        match normalized.as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// A many-to-one reference from one column to another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// The referencing column in this table.
    pub column: String,
    /// The referenced table. Its primary key is the parent key.
    pub target_table: String,
    /// Action on delete of the parent row.
    pub on_delete: Option<ForeignKeyAction>,
}

/// One mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name in the table.
    pub name: String,
    /// Name of the declaring field.
    pub field: String,
    /// Declared Rust type of the field, whitespace-free.
    pub rust_type: String,
    /// Storage class.
    pub storage_type: StorageType,
    /// Whether NULL is accepted.
    pub nullable: bool,
    /// Whether this column is the primary key.
    pub primary_key: bool,
    /// Whether the engine assigns the key when an insert omits it.
    pub auto: bool,
    /// Whether keys are never reused (`AUTOINCREMENT`).
    pub autoincrement: bool,
    /// Whether a plain index is created.
    pub indexed: bool,
    /// Whether values are unique.
    pub unique: bool,
    /// Declared conflict-resolution algorithm.
    pub on_conflict: OnConflict,
    /// Collating sequence.
    pub collate: Collate,
    /// Literal SQL default expression.
    pub default_expr: Option<String>,
    /// Enabled builder helpers.
    pub helpers: Helpers,
}

impl ColumnDescriptor {
    /// Creates a non-null column whose field carries the same name.
    #[must_use]
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            rust_type: String::new(),
            name,
            storage_type,
            nullable: false,
            primary_key: false,
            auto: false,
            autoincrement: false,
            indexed: false,
            unique: false,
            on_conflict: OnConflict::None,
            collate: Collate::Binary,
            default_expr: None,
            helpers: Helpers::automatic(storage_type, false),
        }
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self, auto: bool) -> Self {
        self.primary_key = true;
        self.auto = auto;
        self.nullable = false;
        self
    }

    /// Marks the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Requests an index on the column.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Sets the collating sequence.
    #[must_use]
    pub fn collate(mut self, collate: Collate) -> Self {
        self.collate = collate;
        self
    }

    /// Sets the conflict-resolution algorithm.
    #[must_use]
    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = Some(expr.into());
        self
    }

    /// Replaces the helper set.
    #[must_use]
    pub fn helpers(mut self, helpers: Helpers) -> Self {
        self.helpers = helpers;
        self
    }

    /// The algorithm rendered on this column's constraint.
    #[must_use]
    pub const fn effective_on_conflict(&self) -> OnConflict {
        self.on_conflict.effective(self.unique)
    }

    /// Whether a `CREATE INDEX` statement is emitted for this column.
    #[must_use]
    pub const fn needs_index(&self) -> bool {
        !self.primary_key && (self.indexed || self.unique)
    }

    /// Deterministic index name for this column in `table`.
    #[must_use]
    pub fn index_name(&self, table: &str) -> String {
        format!("index_{}_on_{}", self.name, table)
    }

    /// Whether an insert may leave this column out and let the engine fill it.
    #[must_use]
    pub const fn is_auto_key(&self) -> bool {
        self.primary_key && self.auto
    }
}

/// How rows of a table are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    /// A declared primary-key column, by ordinal.
    Column(usize),
    /// The engine's implicit row id.
    RowId,
}

/// One mapped model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Declared model type name.
    pub model: String,
    /// Columns in declaration order; the order fixes row ordinals.
    pub columns: Vec<ColumnDescriptor>,
    /// Outgoing many-to-one references.
    pub associations: Vec<Association>,
}

impl TableDescriptor {
    /// Creates an empty table descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            model: name.clone(),
            name,
            columns: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends an association.
    #[must_use]
    pub fn association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Returns how rows are addressed.
    ///
    /// With several primary-key columns (rejected by validation) the first wins.
    #[must_use]
    pub fn primary_key(&self) -> PrimaryKey {
        self.columns
            .iter()
            .position(|c| c.primary_key)
            .map_or(PrimaryKey::RowId, PrimaryKey::Column)
    }

    /// Returns the primary-key column, if one is declared.
    #[must_use]
    pub fn primary_key_column(&self) -> Option<&ColumnDescriptor> {
        match self.primary_key() {
            PrimaryKey::Column(index) => self.columns.get(index),
            PrimaryKey::RowId => None,
        }
    }

    /// Name used to target a single row.
    #[must_use]
    pub fn key_column_name(&self) -> &str {
        self.primary_key_column().map_or(ROWID, |c| c.name.as_str())
    }

    /// Looks up a column by name, ignoring ASCII case.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the ordinal of a column, ignoring ASCII case.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl AsRef<Self> for TableDescriptor {
    fn as_ref(&self) -> &Self {
        self
    }
}
