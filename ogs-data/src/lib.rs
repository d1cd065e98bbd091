//! Staging and loading of emission records.
//!
//! Responsibilities:
//! - Validate candidate records against a JSON Schema.
//! - Map provider rows into records and route them into partitions.
//! - Read and write partition trees of staged records.
//! - Resolve references and bulk insert each partition into a document store.
//!
//! Boundaries:
//! - Resolution rules live in `ogs-core`; this crate only drives them.
//! - Batches are loaded sequentially; no retries or concurrency.
//!
//! Invariants:
//! - Per-record failures are logged and counted, never raised.
//! - Each batch issues at most one bulk insert.

pub mod dataset;
mod loader;
pub mod mapping;
mod orchestrator;
pub mod partition;
mod pipeline;
pub mod store;
mod validation;

pub use dataset::{
    DatasetError, DatasetFormat, PartitionFile, PartitionedDataset, read_json, read_json_lines,
    read_values, write_json, write_json_lines, write_partition,
};
pub use loader::{BatchLoader, LoadError, LoadSummary};
pub use mapping::{
    MappedRows, MappingError, ParseProviderError, Provider, Row, RowMapper, map_rows,
};
pub use orchestrator::{LoadReport, PartitionOutcome, PartitionedLoadOrchestrator};
pub use partition::{
    DuplicateSourcePolicy, FilteredPartitions, InvalidPartitionKey, PARTITION_FILE_NAME,
    ParsePolicyError, PartitionFilter, PartitionRouter, RecordSource, check_partition_key,
    leading_segment, partition_key,
};
pub use pipeline::{StagedPartition, stage};
pub use store::{SqliteConnector, SqliteDocumentStore};
pub use validation::{
    RecordRejection, Rejected, SchemaError, SchemaValidator, ValidationReport,
};
