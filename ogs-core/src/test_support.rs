//! In-memory `DocumentStore` used by unit and behaviour tests.
//!
//! Every store opened from one [`MemoryConnector`] shares the same
//! collections, so tests can seed references, run several batches, and then
//! inspect what was inserted. Connection and insert failures can be
//! scheduled to exercise the loader's error paths.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    ConnectionConfig, Document, DocumentStore, ReferenceDataSource, ReferenceGeoComponent,
    StoreConnector, StoreError,
};

#[derive(Debug, Default)]
struct MemoryState {
    geo_components: Vec<ReferenceGeoComponent>,
    data_sources: Vec<ReferenceDataSource>,
    emissions: Vec<Document>,
    connections: usize,
    snapshot_reads: usize,
    insert_calls: usize,
    refused_connections: usize,
    failed_inserts: usize,
}

/// Connector handing out stores over shared in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Create a connector whose reference collections hold the given entities.
    #[must_use]
    pub fn with_references(
        geo_components: Vec<ReferenceGeoComponent>,
        data_sources: Vec<ReferenceDataSource>,
    ) -> Self {
        let connector = Self::default();
        {
            let mut state = connector.lock();
            state.geo_components = geo_components;
            state.data_sources = data_sources;
        }
        connector
    }

    /// Append a geographic reference entity.
    pub fn push_geo_component(&self, entity: ReferenceGeoComponent) {
        self.lock().geo_components.push(entity);
    }

    /// Append a data-source reference entity.
    pub fn push_data_source(&self, entity: ReferenceDataSource) {
        self.lock().data_sources.push(entity);
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next_connections(&self, count: usize) {
        self.lock().refused_connections = count;
    }

    /// Reject the next `count` bulk inserts.
    pub fn fail_next_inserts(&self, count: usize) {
        self.lock().failed_inserts = count;
    }

    /// Documents stored so far, in insertion order.
    #[must_use]
    pub fn emissions(&self) -> Vec<Document> {
        self.lock().emissions.clone()
    }

    /// Number of successful connections.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    /// Number of reference snapshots taken.
    #[must_use]
    pub fn snapshot_reads(&self) -> usize {
        self.lock().snapshot_reads
    }

    /// Number of bulk insert calls, including rejected ones.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreConnector for MemoryConnector {
    type Store = MemoryDocumentStore;

    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Store, StoreError> {
        let mut state = self.lock();
        if state.refused_connections > 0 {
            state.refused_connections -= 1;
            return Err(StoreError::Connection {
                target: config.redacted_uri(),
                source: "connection refused".into(),
            });
        }
        state.connections += 1;
        Ok(MemoryDocumentStore {
            state: Arc::clone(&self.state),
            emissions_collection: config.collections.emissions.clone(),
        })
    }
}

/// Store handle produced by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
    emissions_collection: String,
}

impl MemoryDocumentStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn geo_components(&self) -> Result<Vec<ReferenceGeoComponent>, StoreError> {
        let mut state = self.lock();
        state.snapshot_reads += 1;
        Ok(state.geo_components.clone())
    }

    fn data_sources(&self) -> Result<Vec<ReferenceDataSource>, StoreError> {
        Ok(self.lock().data_sources.clone())
    }

    fn insert_emissions(&mut self, documents: &[Document]) -> Result<usize, StoreError> {
        let mut state = self.lock();
        state.insert_calls += 1;
        if documents.is_empty() {
            return Err(StoreError::EmptyBulkInsert {
                collection: self.emissions_collection.clone(),
            });
        }
        if state.failed_inserts > 0 {
            state.failed_inserts -= 1;
            return Err(StoreError::BulkInsert {
                collection: self.emissions_collection.clone(),
                count: documents.len(),
                source: "write concern failed".into(),
            });
        }
        state.emissions.extend_from_slice(documents);
        Ok(documents.len())
    }
}
