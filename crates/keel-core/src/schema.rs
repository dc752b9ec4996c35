//! A validated, compiled set of tables for one database.
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
//! let schema = Schema::builder().model::<Category>().build().unwrap();
//! assert_eq!(schema.statements().count(), 2);
//! assert_eq!(schema.digest().as_str().len(), 64);
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::builder::TableSurface;
use crate::compile::{compile_table, SchemaDialect, SchemaDigest, SqliteDialect, TableDdl};
use crate::declaration::ModelDeclaration;
use crate::descriptor::TableDescriptor;
use crate::error::{Diagnostic, Diagnostics};
use crate::extract::extract;
use crate::model::Model;
use crate::validate::{validate_table, validate_tables};

/// Collects the tables of one database.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<Arc<TableDescriptor>>,
    diagnostics: Diagnostics,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the table of a derived model.
    #[must_use]
    pub fn model<M: Model>(mut self) -> Self {
        self.tables.push(M::descriptor());
        self
    }

    /// Adds an already extracted table.
    #[must_use]
    pub fn table(mut self, table: impl Into<Arc<TableDescriptor>>) -> Self {
        self.tables.push(table.into());
        self
    }

    /// Extracts and adds a declared model; extraction errors are kept for
    /// [`build`](Self::build).
    #[must_use]
    pub fn declaration(mut self, declaration: &ModelDeclaration) -> Self {
        match extract(declaration) {
            Ok(table) => self.tables.push(Arc::new(table)),
            Err(errors) => self.diagnostics.extend(errors),
        }
        self
    }

    /// Validates and compiles with the SQLite dialect.
    ///
    /// # Errors
    ///
    /// Returns every diagnostic of the set; no partial schema is produced.
    pub fn build(self) -> Result<Schema, Diagnostics> {
        self.build_with(&SqliteDialect)
    }

    /// Validates and compiles with `dialect`.
    ///
    /// Diagnostics are ordered: extraction errors in the order models were
    /// added, then per-table errors by table name, then cross-table errors.
    ///
    /// # Errors
    ///
    /// Returns every diagnostic of the set; no partial schema is produced.
    pub fn build_with<D: SchemaDialect + ?Sized>(self, dialect: &D) -> Result<Schema, Diagnostics> {
        let Self {
            mut tables,
            mut diagnostics,
        } = self;
        tables.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        for table in &tables {
            diagnostics.extend(validate_table(table));
        }
        diagnostics.extend(validate_tables(&tables));
        diagnostics.into_result()?;

        let mut ddl = Vec::with_capacity(tables.len());
        for table in &tables {
            let compiled = compile_table(dialect, table).map_err(|err| {
                let mut diagnostics = Diagnostics::new();
                diagnostics.push(Diagnostic::Compilation(err));
                diagnostics
            })?;
            ddl.push(compiled);
        }

        let digest = SchemaDigest::compute(&ddl);
        debug!(tables = tables.len(), digest = %digest, "Compiled schema");
        Ok(Schema {
            tables,
            ddl,
            digest,
        })
    }
}

/// An immutable, validated set of tables with their DDL and digest.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<Arc<TableDescriptor>>,
    ddl: Vec<TableDdl>,
    digest: SchemaDigest,
}

impl Schema {
    /// Starts collecting tables.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Builds a schema from declarations only.
    ///
    /// # Errors
    ///
    /// Returns every extraction and validation diagnostic.
    pub fn from_declarations<'a>(
        declarations: impl IntoIterator<Item = &'a ModelDeclaration>,
    ) -> Result<Self, Diagnostics> {
        declarations
            .into_iter()
            .fold(SchemaBuilder::new(), SchemaBuilder::declaration)
            .build()
    }

    /// Tables sorted by name.
    #[must_use]
    pub fn tables(&self) -> &[Arc<TableDescriptor>] {
        &self.tables
    }

    /// Looks up a table, ignoring ASCII case.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Arc<TableDescriptor>> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Per-table DDL, sorted by table name.
    #[must_use]
    pub fn ddl(&self) -> &[TableDdl] {
        &self.ddl
    }

    /// Every statement in execution order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.ddl.iter().flat_map(TableDdl::statements)
    }

    /// The digest of all DDL.
    #[must_use]
    pub const fn digest(&self) -> &SchemaDigest {
        &self.digest
    }

    /// The dynamic builder contract of a table.
    #[must_use]
    pub fn surface(&self, table: &str) -> Option<TableSurface> {
        self.table(table).map(|t| TableSurface::derive(t))
    }
}
