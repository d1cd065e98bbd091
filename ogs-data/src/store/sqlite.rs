use std::collections::BTreeMap;

use camino::Utf8Path;
use log::debug;
use ogs_core::{
    BoxError, ConnectionConfig, Document, DocumentId, DocumentStore, ReferenceDataSource,
    ReferenceGeoComponent, StoreConnector, StoreError,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::schema::{CollectionSchemaError, initialise_schema};

/// URI scheme served by [`SqliteConnector`].
pub const SQLITE_SCHEME: &str = "sqlite";

/// Endpoint value selecting a private in-memory database.
pub const IN_MEMORY_ENDPOINT: &str = ":memory:";

/// Opens [`SqliteDocumentStore`]s.
///
/// The first endpoint names the directory holding `<database_name>.db`, or
/// is [`IN_MEMORY_ENDPOINT`]. Connection options become SQLite URI query
/// parameters (for example `mode=ro`).
///
/// # Examples
/// ```
/// use ogs_core::{ConnectionConfig, DocumentStore, StoreConnector};
/// use ogs_data::store::{IN_MEMORY_ENDPOINT, SQLITE_SCHEME, SqliteConnector};
///
/// let config = ConnectionConfig::new(SQLITE_SCHEME, "emissions")
///     .with_endpoints([IN_MEMORY_ENDPOINT]);
/// let mut store = SqliteConnector.connect(&config).expect("open store");
///
/// let france = store
///     .insert_geo_component([("alpha3".to_owned(), "FRA".to_owned())].into())
///     .expect("seed reference");
/// let snapshot = store.snapshot().expect("read references");
/// assert_eq!(snapshot.geo_components()[0].id, france);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl StoreConnector for SqliteConnector {
    type Store = SqliteDocumentStore;

    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Store, StoreError> {
        let target = config.redacted_uri();
        let connection_error = |source: BoxError| StoreError::Connection {
            target: target.clone(),
            source,
        };

        if config.scheme != SQLITE_SCHEME {
            return Err(connection_error(
                format!("unsupported scheme {:?}; expected {SQLITE_SCHEME}", config.scheme).into(),
            ));
        }
        if config.credentials.is_some() {
            debug!("SQLite stores do not authenticate; ignoring credentials for {target}");
        }
        let endpoint = config
            .endpoints
            .first()
            .ok_or_else(|| connection_error("no endpoint configured".into()))?;
        let uri = database_uri(endpoint, &config.database_name, &config.options);

        let mut connection =
            Connection::open(&uri).map_err(|source| connection_error(source.into()))?;
        let collections = &config.collections;
        initialise_schema(
            &mut connection,
            &[
                collections.geo_components.as_str(),
                collections.data_sources.as_str(),
                collections.emissions.as_str(),
            ],
        )
        .map_err(|err| match err {
            CollectionSchemaError::InvalidName { name } => {
                StoreError::InvalidCollectionName { name }
            }
            other => connection_error(other.into()),
        })?;
        debug!("opened SQLite document store at {uri}");

        Ok(SqliteDocumentStore {
            connection,
            geo_components: collections.geo_components.clone(),
            data_sources: collections.data_sources.clone(),
            emissions: collections.emissions.clone(),
        })
    }
}

pub(super) fn database_uri(
    endpoint: &str,
    database_name: &str,
    options: &BTreeMap<String, String>,
) -> String {
    let location = if endpoint == IN_MEMORY_ENDPOINT {
        IN_MEMORY_ENDPOINT.to_owned()
    } else {
        let path = Utf8Path::new(endpoint).join(format!("{database_name}.db"));
        escape_uri_path(path.as_str())
    };
    let mut uri = format!("file:{location}");
    if !options.is_empty() {
        let params: Vec<String> = options
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        uri.push('?');
        uri.push_str(&params.join("&"));
    }
    uri
}

fn escape_uri_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '?' => escaped.push_str("%3f"),
            '#' => escaped.push_str("%23"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[derive(Deserialize)]
struct StoredGeoComponent {
    identifiers: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct NewGeoComponent<'a> {
    identifiers: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct StoredDataSource {
    name: String,
}

#[derive(Serialize)]
struct NewDataSource<'a> {
    name: &'a str,
}

/// Document store keeping each collection in its own SQLite table.
#[derive(Debug)]
pub struct SqliteDocumentStore {
    connection: Connection,
    geo_components: String,
    data_sources: String,
    emissions: String,
}

impl SqliteDocumentStore {
    /// Add a geographic reference entity, returning its identifier.
    ///
    /// # Errors
    /// Returns [`StoreError::BulkInsert`] when the row cannot be written.
    pub fn insert_geo_component(
        &mut self,
        identifiers: BTreeMap<String, String>,
    ) -> Result<DocumentId, StoreError> {
        let collection = self.geo_components.clone();
        self.insert_one(&collection, &NewGeoComponent {
            identifiers: &identifiers,
        })
    }

    /// Add a data-source reference entity, returning its identifier.
    ///
    /// # Errors
    /// Returns [`StoreError::BulkInsert`] when the row cannot be written.
    pub fn insert_data_source(&mut self, name: &str) -> Result<DocumentId, StoreError> {
        let collection = self.data_sources.clone();
        self.insert_one(&collection, &NewDataSource { name })
    }

    /// Number of stored emission documents.
    ///
    /// # Errors
    /// Returns [`StoreError::Read`] when the table cannot be queried.
    pub fn count_emissions(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.emissions), [], |row| {
                row.get(0)
            })
            .map_err(|source| StoreError::Read {
                collection: self.emissions.clone(),
                source: source.into(),
            })?;
        usize::try_from(count).map_err(|source| StoreError::Read {
            collection: self.emissions.clone(),
            source: source.into(),
        })
    }

    /// Stored emission documents in insertion order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the table cannot be read or a row holds
    /// malformed JSON.
    pub fn emission_documents(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .read_collection::<Value>(&self.emissions)?
            .into_iter()
            .map(|(_, document)| document)
            .collect())
    }

    fn insert_one<T: Serialize>(
        &mut self,
        collection: &str,
        document: &T,
    ) -> Result<DocumentId, StoreError> {
        let failed = |source: BoxError| StoreError::BulkInsert {
            collection: collection.to_owned(),
            count: 1,
            source,
        };
        let json = serde_json::to_string(document).map_err(|source| failed(source.into()))?;
        self.connection
            .execute(
                &format!("INSERT INTO \"{collection}\" (document) VALUES (?1)"),
                [json],
            )
            .map_err(|source| failed(source.into()))?;
        Ok(DocumentId::new(self.connection.last_insert_rowid()))
    }

    fn read_collection<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<(DocumentId, T)>, StoreError> {
        let read_error = |source: rusqlite::Error| StoreError::Read {
            collection: collection.to_owned(),
            source: source.into(),
        };
        let mut statement = self
            .connection
            .prepare_cached(&format!(
                "SELECT id, document FROM \"{collection}\" ORDER BY id"
            ))
            .map_err(read_error)?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(read_error)?;

        let mut documents = Vec::new();
        for row in rows {
            let (raw_id, json) = row.map_err(read_error)?;
            let id = DocumentId::new(raw_id);
            let document = serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                collection: collection.to_owned(),
                id,
                source: source.into(),
            })?;
            documents.push((id, document));
        }
        Ok(documents)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn geo_components(&self) -> Result<Vec<ReferenceGeoComponent>, StoreError> {
        Ok(self
            .read_collection::<StoredGeoComponent>(&self.geo_components)?
            .into_iter()
            .map(|(id, stored)| ReferenceGeoComponent {
                id,
                identifiers: stored.identifiers,
            })
            .collect())
    }

    fn data_sources(&self) -> Result<Vec<ReferenceDataSource>, StoreError> {
        Ok(self
            .read_collection::<StoredDataSource>(&self.data_sources)?
            .into_iter()
            .map(|(id, stored)| ReferenceDataSource {
                id,
                name: stored.name,
            })
            .collect())
    }

    fn insert_emissions(&mut self, documents: &[Document]) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Err(StoreError::EmptyBulkInsert {
                collection: self.emissions.clone(),
            });
        }
        let failed = |source: BoxError| StoreError::BulkInsert {
            collection: self.emissions.clone(),
            count: documents.len(),
            source,
        };

        let transaction = self
            .connection
            .transaction()
            .map_err(|source| failed(source.into()))?;
        {
            let mut insert = transaction
                .prepare_cached(&format!(
                    "INSERT INTO \"{}\" (document) VALUES (?1)",
                    self.emissions
                ))
                .map_err(|source| failed(source.into()))?;
            for document in documents {
                let json =
                    serde_json::to_string(document).map_err(|source| failed(source.into()))?;
                insert.execute([json]).map_err(|source| failed(source.into()))?;
            }
        }
        transaction
            .commit()
            .map_err(|source| failed(source.into()))?;
        Ok(documents.len())
    }
}
