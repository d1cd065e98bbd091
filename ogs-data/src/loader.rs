//! Resolve one batch of records against a reference snapshot and store it.
//!
//! Every [`BatchLoader::load_batch`] call opens its own connection, reads the
//! reference collections exactly once, and issues at most one bulk insert.
//! Records whose references cannot be resolved are logged and counted; they
//! never abort the batch.

use log::{debug, error, info, warn};
use ogs_core::{
    ConnectionConfig, DocumentStore, Record, StoreConnector, StoreError, build_document,
};
use serde::Serialize;
use thiserror::Error;

/// Counts reported by a successful batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Documents stored by the bulk insert.
    pub inserted: usize,
    /// Records dropped because a reference did not resolve.
    pub failed: usize,
}

impl LoadSummary {
    /// Number of records the batch received.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.failed
    }
}

/// Batch-level failures; per-record failures are counted instead.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The store could not be opened.
    #[error("failed to connect to the document store")]
    Connection {
        /// Store error.
        #[source]
        source: StoreError,
    },
    /// The reference collections could not be read.
    #[error("failed to read the reference snapshot")]
    Snapshot {
        /// Store error.
        #[source]
        source: StoreError,
    },
    /// The bulk insert was rejected and the resolved documents were lost.
    #[error("bulk insert of {attempted} resolved documents failed")]
    BulkInsert {
        /// Resolved documents that were not stored.
        attempted: usize,
        /// Number of records dropped during resolution.
        failed: usize,
        /// Store error.
        #[source]
        source: StoreError,
    },
}

/// Loads batches of records through a [`StoreConnector`].
///
/// # Examples
///
/// ```
/// use ogs_core::{ConnectionConfig, DocumentId, ReferenceDataSource, ReferenceGeoComponent};
/// use ogs_core::test_support::MemoryConnector;
/// use ogs_data::BatchLoader;
///
/// let connector = MemoryConnector::with_references(
///     vec![ReferenceGeoComponent {
///         id: DocumentId::new(1),
///         identifiers: [("alpha3".to_owned(), "FRA".to_owned())].into(),
///     }],
///     vec![ReferenceDataSource { id: DocumentId::new(9), name: "gcp".to_owned() }],
/// );
/// let loader = BatchLoader::new(connector, ConnectionConfig::new("memory", "emissions"));
///
/// let summary = loader.load_batch(&[])?;
/// assert_eq!(summary.inserted, 0);
/// # Ok::<(), ogs_data::LoadError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BatchLoader<C> {
    connector: C,
    config: ConnectionConfig,
}

impl<C: StoreConnector> BatchLoader<C> {
    /// Create a loader connecting with `config`.
    pub const fn new(connector: C, config: ConnectionConfig) -> Self {
        Self { connector, config }
    }

    /// Connection settings used for every batch.
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connector handing out store handles.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Resolve `records` in order and bulk insert the resulting documents.
    ///
    /// The insert is skipped when no record resolved.
    ///
    /// # Errors
    /// Returns [`LoadError`] when connecting, reading references or the bulk
    /// insert fails.
    pub fn load_batch(&self, records: &[Record]) -> Result<LoadSummary, LoadError> {
        let mut store = self
            .connector
            .connect(&self.config)
            .map_err(|source| LoadError::Connection { source })?;
        let snapshot = store
            .snapshot()
            .map_err(|source| LoadError::Snapshot { source })?;
        debug!(
            "reference snapshot holds {} geo components and {} data sources",
            snapshot.geo_components().len(),
            snapshot.data_sources().len()
        );

        let resolver = snapshot.resolver();
        let mut documents = Vec::with_capacity(records.len());
        let mut failed = 0;
        for (index, record) in records.iter().enumerate() {
            match build_document(record, &resolver) {
                Ok(document) => documents.push(document),
                Err(err) => {
                    error!("dropping record {index}: {err}");
                    failed += 1;
                }
            }
        }

        let inserted = if documents.is_empty() {
            0
        } else {
            store
                .insert_emissions(&documents)
                .map_err(|source| LoadError::BulkInsert {
                    attempted: documents.len(),
                    failed,
                    source,
                })?
        };

        let summary = LoadSummary { inserted, failed };
        if failed == 0 {
            info!("inserted {inserted} emission documents");
        } else {
            warn!("inserted {inserted} emission documents, {failed} records dropped");
        }
        Ok(summary)
    }
}
