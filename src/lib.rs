//! Facade crate for the open greenhouse-gas emissions loader.
//!
//! This crate re-exports the core record, reference and store types and
//! exposes the file-backed loading pipeline behind the `loader` feature.

#![forbid(unsafe_code)]

pub use ogs_core::{
    CollectionNames, ConnectionConfig, Credentials, DataSource, Document, DocumentId,
    DocumentStore, Emission, GeoComponent, GeoIdentifier, Record, ReferenceSnapshot,
    ResolutionError, Sector, StoreConnector, StoreError, Unit, build_document,
};

#[cfg(feature = "loader")]
pub use ogs_data::{
    BatchLoader, DuplicateSourcePolicy, LoadError, LoadReport, LoadSummary, PartitionFilter,
    PartitionOutcome, PartitionedDataset, PartitionedLoadOrchestrator, SchemaValidator,
    SqliteConnector, stage,
};
