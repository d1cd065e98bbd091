//! Staging: validate raw candidates and bucket the survivors for loading.

use camino::{Utf8Path, Utf8PathBuf};
use ogs_core::Record;
use serde_json::Value;

use crate::{DatasetError, PartitionRouter, Rejected, SchemaValidator, write_partition};

/// Validated records routed under one partition key.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPartition {
    /// Partition key the records belong to.
    pub key: String,
    /// Records that passed validation, in input order.
    pub records: Vec<Record>,
    /// Candidates dropped by validation.
    pub rejected: Vec<Rejected>,
}

impl StagedPartition {
    /// Persist the records as `<root>/<key>`, returning the file written.
    ///
    /// # Errors
    /// Returns [`DatasetError`] when the partition file cannot be written.
    pub fn write(&self, root: &Utf8Path) -> Result<Utf8PathBuf, DatasetError> {
        write_partition(root, &self.key, &self.records)
    }
}

/// Validate `candidates` and route the survivors through `router`.
///
/// # Examples
///
/// ```
/// use ogs_data::{PartitionRouter, SchemaValidator, stage};
/// use serde_json::json;
///
/// let staged = stage(
///     vec![json!({"not": "a record"})],
///     &SchemaValidator::staging()?,
///     &PartitionRouter::new(&["gcp"])?,
/// );
/// assert_eq!(staged.key, "gcp/data.json");
/// assert_eq!(staged.rejected.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn stage(
    candidates: Vec<Value>,
    validator: &SchemaValidator,
    router: &PartitionRouter,
) -> StagedPartition {
    let report = validator.validate(candidates);
    let (key, records) = router
        .route(report.records)
        .into_iter()
        .next()
        .unwrap_or_else(|| (router.key().to_owned(), Vec::new()));
    StagedPartition {
        key,
        records,
        rejected: report.rejected,
    }
}
