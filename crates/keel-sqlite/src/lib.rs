//! # keel-sqlite
//!
//! SQLite storage for `keel` schemas, built on `sqlx`.
//!
//! Opening a [`Database`] compares the digest stored in the `keel_metadata`
//! table with the digest of the compiled schema. A missing or different
//! digest drops every user table and recreates the schema in one
//! transaction; a matching one leaves the database untouched.
//!
//! ```rust,no_run
//! use keel_core::prelude::*;
//! use keel_derive::Model;
//! use keel_sqlite::{Database, DatabaseOptions};
//!
//! #[derive(Debug, Default, Model)]
//! struct Note {
//!     #[primary_key]
//!     id: i64,
//!     #[column(helpers(eq))]
//!     body: String,
//! }
//!
//! # async fn run() -> keel_sqlite::Result<()> {
//! let schema = Schema::builder().model::<Note>().build()?;
//! let db = Database::open(&DatabaseOptions::default(), schema).await?;
//! let conn = db.connection();
//!
//! conn.insert(&Note { id: 0, body: "hello".into() }).await?;
//! let notes = conn
//!     .select(&Selector::<Note>::new().where_clause(Note::body().eq("hello")))
//!     .await?;
//! assert_eq!(notes.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod digest_store;
pub mod error;
pub mod migrator;
pub mod options;
pub mod row;

pub use connection::{Connection, Database, Transaction};
pub use digest_store::{DigestStore, StoredDigest, METADATA_TABLE};
pub use error::{MigrationError, Result};
pub use migrator::{MigrationReport, SchemaMigrator};
pub use options::DatabaseOptions;
pub use row::SqliteRowSource;
