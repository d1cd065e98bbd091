use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `ogs_schema_version` by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the collection tables inside an existing SQLite database.
///
/// Every collection is a table holding one JSON document per row; the row id
/// is the document identifier. Existing databases must already record
/// [`SCHEMA_VERSION`]; mismatches are rejected so migrations can be applied
/// explicitly.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use ogs_data::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn, &["geo_components", "emissions"]).expect("create tables");
///
/// let tables: i64 = conn
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('geo_components', 'emissions')",
///         [],
///         |row| row.get(0),
///     )
///     .expect("count tables");
/// assert_eq!(tables, 2);
/// ```
pub fn initialise_schema(
    connection: &mut Connection,
    collections: &[&str],
) -> Result<(), CollectionSchemaError> {
    for name in collections {
        if !is_identifier(name) {
            return Err(CollectionSchemaError::InvalidName {
                name: (*name).to_owned(),
            });
        }
    }

    let transaction = connection
        .transaction()
        .map_err(|source| CollectionSchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    ensure_schema_version(&transaction)?;
    for name in collections {
        run_migration_step(
            &transaction,
            "create collection table",
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    document TEXT NOT NULL CHECK (json_valid(document))
                )"
            ),
        )?;
    }

    transaction
        .commit()
        .map_err(|source| CollectionSchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

/// Whether `name` can be used unescaped as a table name.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("sqlite_")
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), CollectionSchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS ogs_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row("SELECT version FROM ogs_schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|source| CollectionSchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(CollectionSchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO ogs_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| CollectionSchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), CollectionSchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| CollectionSchemaError::Migration { step, source })
}

/// Errors raised when preparing the collection tables.
#[derive(Debug, Error)]
pub enum CollectionSchemaError {
    /// A collection name is not a plain SQL identifier.
    #[error("collection name {name:?} is not a valid identifier")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Step being executed.
        step: &'static str,
        /// Driver error.
        #[source]
        source: SqliteError,
    },
    /// The database was created by another schema version.
    #[error(
        "expected collection schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
