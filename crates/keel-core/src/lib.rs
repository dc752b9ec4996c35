//! # keel-core
//!
//! A schema compiler for annotated data models.
//!
//! This crate provides:
//! - Model declarations and the extractor that turns them into table
//!   descriptors
//! - A validator that reports every schema problem at once
//! - A compiler producing deterministic SQLite DDL and a schema digest
//! - A typed query-builder surface whose operations are gated, per column,
//!   by a capability set
//! - The migration comparator used when a database is opened
//!
//! Nothing here performs I/O; the storage side lives in `keel-sqlite`.
//!
//! ## Compiling a schema
//!
//! ```rust
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//!
//! #[derive(Debug, Default, Model)]
//! struct Category {
//!     #[primary_key]
//!     id: i64,
//!     #[column(unique)]
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Model)]
//! struct Item {
//!     #[primary_key]
//!     id: i64,
//!     #[column(name = "categoryId", references = "Category")]
//!     category_id: i64,
//!     #[column]
//!     name: String,
//! }
//!
//! let schema = Schema::builder()
//!     .model::<Item>()
//!     .model::<Category>()
//!     .build()
//!     .unwrap();
//!
//! // Category first: tables are kept sorted by name.
//! assert_eq!(schema.tables()[0].name, "Category");
//! assert_eq!(schema.statements().count(), 3);
//! ```
//!
//! ## Typed builders
//!
//! Conditions are only available on columns whose helper set enables them:
//!
//! ```rust
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//!
//! #[derive(Debug, Default, Model)]
//! struct Item {
//!     #[primary_key]
//!     id: i64,
//!     #[column(helpers(eq, in_list))]
//!     name: String,
//! }
//!
//! let (sql, params) = Selector::<Item>::new()
//!     .where_clause(Item::name().in_list(["a", "b"]))
//!     .build();
//!
//! assert_eq!(sql, "SELECT \"id\", \"name\" FROM \"Item\" WHERE \"name\" IN (?, ?)");
//! assert_eq!(params.len(), 2);
//! ```

pub mod builder;
pub mod compile;
pub mod declaration;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod migration;
pub mod model;
pub mod row;
pub mod schema;
pub mod validate;

pub use builder::{Deleter, Inserter, Selector, SqlValue, Updater};
pub use compile::{SchemaDialect, SchemaDigest, SqliteDialect, TableDdl};
pub use declaration::{ColumnAnnotation, FieldDeclaration, ModelDeclaration, PrimaryKeyAnnotation};
pub use descriptor::{ColumnDescriptor, Helpers, OnConflict, StorageType, TableDescriptor};
pub use error::{
    CompilationError, Diagnostic, Diagnostics, ExtractionError, SurfaceError, ValidationError,
};
pub use migration::{compare, MigrationDecision};
pub use model::Model;
pub use row::{RowError, RowSource, ValueRow};
pub use schema::{Schema, SchemaBuilder};

/// Everything needed to declare models and build statements.
pub mod prelude {
    pub use crate::builder::{
        Column, Condition, Deleter, FromSqlValue, Inserter, Ordering, Selector, SqlValue,
        SupportsBetween, SupportsEq, SupportsGe, SupportsGt, SupportsIn, SupportsIsNotNull,
        SupportsIsNull, SupportsLe, SupportsLt, SupportsNotEq, SupportsNotIn, SupportsOrderAsc,
        SupportsOrderDesc, ToSqlValue, Updater,
    };
    pub use crate::descriptor::OnConflict;
    pub use crate::error::Diagnostics;
    pub use crate::model::Model;
    pub use crate::row::{RowSource, ValueRow};
    pub use crate::schema::{Schema, SchemaBuilder};
}
