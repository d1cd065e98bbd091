//! Load every retained partition through a [`BatchLoader`].
//!
//! Partitions run sequentially in key order. A fatal failure in one partition
//! is recorded in its [`PartitionOutcome`] and the next partition is still
//! attempted.

use std::collections::BTreeMap;

use log::{error, info};
use ogs_core::StoreConnector;
use serde::Serialize;

use crate::{BatchLoader, FilteredPartitions, LoadSummary, RecordSource};

/// What happened to one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionOutcome {
    /// The batch completed; see the counts.
    Loaded(LoadSummary),
    /// The partition could not be read or stored.
    Failed {
        /// Rendered error chain.
        message: String,
    },
}

/// Per-partition outcomes and totals for one orchestrated load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Outcome per partition key.
    pub partitions: BTreeMap<String, PartitionOutcome>,
    /// Required sources with no partition.
    pub missing_sources: Vec<String>,
    /// Partitions flagged by the duplicate source policy.
    pub duplicate_partitions: Vec<String>,
    /// Documents stored across all partitions.
    pub inserted: usize,
    /// Records dropped during resolution across all partitions.
    pub failed: usize,
}

impl LoadReport {
    /// Whether any partition failed fatally.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.partitions
            .values()
            .any(|outcome| matches!(outcome, PartitionOutcome::Failed { .. }))
    }

    /// Keys of partitions that failed fatally.
    #[must_use]
    pub fn failed_partitions(&self) -> Vec<&str> {
        self.partitions
            .iter()
            .filter(|(_, outcome)| matches!(outcome, PartitionOutcome::Failed { .. }))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Drives a [`BatchLoader`] over filtered partitions.
#[derive(Debug, Clone)]
pub struct PartitionedLoadOrchestrator<C> {
    loader: BatchLoader<C>,
}

impl<C: StoreConnector> PartitionedLoadOrchestrator<C> {
    /// Wrap `loader`.
    pub const fn new(loader: BatchLoader<C>) -> Self {
        Self { loader }
    }

    /// The loader used for each partition.
    pub const fn loader(&self) -> &BatchLoader<C> {
        &self.loader
    }

    /// Materialise and load each retained partition in key order.
    pub fn load<S: RecordSource>(&self, filtered: FilteredPartitions<S>) -> LoadReport {
        let FilteredPartitions {
            retained,
            missing,
            duplicates,
        } = filtered;
        let mut report = LoadReport {
            missing_sources: missing,
            duplicate_partitions: duplicates,
            ..LoadReport::default()
        };

        for (key, source) in retained {
            let outcome = match self.load_partition(&key, &source) {
                Ok(summary) => {
                    report.inserted += summary.inserted;
                    report.failed += summary.failed;
                    PartitionOutcome::Loaded(summary)
                }
                Err(message) => {
                    error!("partition {key} failed: {message}");
                    PartitionOutcome::Failed { message }
                }
            };
            report.partitions.insert(key, outcome);
        }

        info!(
            "loaded {} partitions: {} documents inserted, {} records dropped",
            report.partitions.len(),
            report.inserted,
            report.failed
        );
        report
    }

    fn load_partition<S: RecordSource>(
        &self,
        key: &str,
        source: &S,
    ) -> Result<LoadSummary, String> {
        let records = source.load().map_err(|err| render_chain(&err))?;
        info!("loading {} records from partition {key}", records.len());
        self.loader
            .load_batch(&records)
            .map_err(|err| render_chain(&err))
    }
}

fn render_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
