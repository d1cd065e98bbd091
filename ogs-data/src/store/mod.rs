//! SQLite-backed document store.
//!
//! - [`schema`] creates one JSON document table per collection and records
//!   the schema version.
//! - [`sqlite`] implements [`ogs_core::StoreConnector`] and
//!   [`ogs_core::DocumentStore`] on top of those tables.
#![forbid(unsafe_code)]

mod schema;
mod sqlite;

pub use schema::{CollectionSchemaError, SCHEMA_VERSION, initialise_schema};
pub use sqlite::{IN_MEMORY_ENDPOINT, SQLITE_SCHEME, SqliteConnector, SqliteDocumentStore};
