//! Document store abstraction used by the batch loader.
//!
//! The loader only needs three operations from a store: read both reference
//! collections and bulk insert emission documents. Connecting is split into
//! [`StoreConnector`] so every batch opens its own connection and snapshot.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    ConnectionConfig, Document, DocumentId, ReferenceDataSource, ReferenceGeoComponent,
    ReferenceSnapshot,
};

/// Boxed driver error carried as the source of a [`StoreError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by document store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the store failed.
    #[error("failed to connect to {target}")]
    Connection {
        /// Redacted connection target.
        target: String,
        /// Driver error.
        #[source]
        source: BoxError,
    },
    /// Reading a collection failed.
    #[error("failed to read collection {collection}")]
    Read {
        /// Collection being read.
        collection: String,
        /// Driver error.
        #[source]
        source: BoxError,
    },
    /// A stored document did not have the expected shape.
    #[error("failed to decode document {id} in collection {collection}")]
    Decode {
        /// Collection holding the document.
        collection: String,
        /// Identifier of the malformed document.
        id: DocumentId,
        /// Decoder error.
        #[source]
        source: BoxError,
    },
    /// The bulk insert was rejected; none of its documents were stored.
    #[error("bulk insert of {count} documents into {collection} failed")]
    BulkInsert {
        /// Destination collection.
        collection: String,
        /// Number of documents submitted.
        count: usize,
        /// Driver error.
        #[source]
        source: BoxError,
    },
    /// A bulk insert was attempted with no documents.
    #[error("refusing to bulk insert an empty batch into {collection}")]
    EmptyBulkInsert {
        /// Destination collection.
        collection: String,
    },
    /// A configured collection name cannot be used by the backend.
    #[error("collection name {name:?} is not a valid identifier")]
    InvalidCollectionName {
        /// Offending name.
        name: String,
    },
}

/// Read references and write emission documents.
pub trait DocumentStore {
    /// Return every geographic reference entity in store order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the collection cannot be read or decoded.
    fn geo_components(&self) -> Result<Vec<ReferenceGeoComponent>, StoreError>;

    /// Return every data-source reference entity in store order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the collection cannot be read or decoded.
    fn data_sources(&self) -> Result<Vec<ReferenceDataSource>, StoreError>;

    /// Insert all documents in one call, returning the number stored.
    ///
    /// Implementations must reject an empty slice with
    /// [`StoreError::EmptyBulkInsert`] and must store nothing when the call
    /// fails.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the insert is rejected.
    fn insert_emissions(&mut self, documents: &[Document]) -> Result<usize, StoreError>;

    /// Copy both reference collections into an immutable snapshot.
    ///
    /// # Errors
    /// Propagates failures from either collection read.
    fn snapshot(&self) -> Result<ReferenceSnapshot, StoreError> {
        Ok(ReferenceSnapshot::new(
            self.geo_components()?,
            self.data_sources()?,
        ))
    }
}

/// Open [`DocumentStore`] connections from a [`ConnectionConfig`].
pub trait StoreConnector {
    /// Store handle produced by a successful connection.
    type Store: DocumentStore;

    /// Connect using the supplied configuration.
    ///
    /// # Errors
    /// Returns [`StoreError::Connection`] when the store cannot be reached
    /// and [`StoreError::InvalidCollectionName`] when the configuration is
    /// unusable for this backend.
    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Store, StoreError>;
}
