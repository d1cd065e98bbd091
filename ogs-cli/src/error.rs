//! Error types emitted by the `ogs` CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ogs_data::{
    DatasetError, InvalidPartitionKey, ParsePolicyError, ParseProviderError, SchemaError,
};
use thiserror::Error;

/// Errors emitted by the `ogs` CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The mapper name is not a known provider.
    #[error(transparent)]
    UnknownMapper(#[from] ParseProviderError),
    /// The duplicate policy name is not recognised.
    #[error(transparent)]
    UnknownDuplicatePolicy(#[from] ParsePolicyError),
    /// A `--provider` key cannot name a directory below the output root.
    #[error(transparent)]
    InvalidPartitionKey(#[from] InvalidPartitionKey),
    /// A store option is not written as `key=value`.
    #[error("store option {option:?} must be written as key=value")]
    InvalidStoreOption { option: String },
    /// Reading a schema file failed.
    #[error("failed to read schema at {path:?}: {source}")]
    ReadSchema {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The schema could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),
    /// Reading or writing a dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// Serialising a report failed.
    #[error("failed to serialise report: {0}")]
    SerialiseReport(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// At least one partition could not be loaded.
    #[error("{failed} of {total} partitions failed to load")]
    PartitionsFailed { failed: usize, total: usize },
}
