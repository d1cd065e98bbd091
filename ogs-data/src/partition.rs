//! Partition routing and source filtering.
//!
//! A partition key is an ordered list of classification keys joined by `/`
//! with the literal trailing segment `data.json`; its leading segment names the
//! data source. The filter keeps the partitions of the requested sources,
//! reports requested sources nothing matched, and applies a
//! [`DuplicateSourcePolicy`] when one source owns several partitions.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use log::warn;
use ogs_core::Record;
use thiserror::Error;

use crate::DatasetError;

/// File name terminating every partition key.
pub const PARTITION_FILE_NAME: &str = "data.json";

/// Join classification keys into a partition key.
///
/// # Examples
///
/// ```
/// use ogs_data::partition_key;
///
/// assert_eq!(partition_key(&["wri-unfccc", "UNFCCC_AI"]), "wri-unfccc/UNFCCC_AI/data.json");
/// ```
#[must_use]
pub fn partition_key<S: AsRef<str>>(keys: &[S]) -> String {
    let mut key = String::new();
    for segment in keys {
        key.push_str(segment.as_ref());
        key.push('/');
    }
    key.push_str(PARTITION_FILE_NAME);
    key
}

/// A partition key segment that would not name a directory below the
/// partition root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid partition key segment {0:?}: expected a non-empty name other than `.` or `..` without path separators")]
pub struct InvalidPartitionKey(pub String);

fn check_segment(segment: &str) -> Result<(), InvalidPartitionKey> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']) {
        return Err(InvalidPartitionKey(segment.to_owned()));
    }
    Ok(())
}

/// Check that every `/`-separated segment of `key` stays below the root.
///
/// # Errors
/// Returns [`InvalidPartitionKey`] naming the first offending segment.
pub fn check_partition_key(key: &str) -> Result<(), InvalidPartitionKey> {
    key.split('/').try_for_each(check_segment)
}

/// Return the data source a partition key belongs to.
#[must_use]
pub fn leading_segment(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}

/// Buckets a validated collection under a fixed partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRouter {
    key: String,
}

impl PartitionRouter {
    /// Route under the key built from `keys`.
    ///
    /// # Errors
    /// Returns [`InvalidPartitionKey`] when a key is empty, is `.` or `..`,
    /// or contains a path separator.
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Result<Self, InvalidPartitionKey> {
        keys.iter().try_for_each(|key| check_segment(key.as_ref()))?;
        Ok(Self {
            key: partition_key(keys),
        })
    }

    /// The partition key records are routed to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wrap `records` as the single partition of this router.
    #[must_use]
    pub fn route(&self, records: Vec<Record>) -> BTreeMap<String, Vec<Record>> {
        BTreeMap::from([(self.key.clone(), records)])
    }
}

/// Lazily materialised partition contents.
pub trait RecordSource {
    /// Produce the partition's records.
    ///
    /// # Errors
    /// Returns [`DatasetError`] when the backing data cannot be read.
    fn load(&self) -> Result<Vec<Record>, DatasetError>;
}

impl<F> RecordSource for F
where
    F: Fn() -> Result<Vec<Record>, DatasetError>,
{
    fn load(&self) -> Result<Vec<Record>, DatasetError> {
        self()
    }
}

/// How to treat several partitions claiming the same source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateSourcePolicy {
    /// Keep every partition without comment.
    #[default]
    Accept,
    /// Keep every partition and warn about the extra ones.
    Warn,
    /// Keep the first partition in key order; warn about and skip the rest.
    FirstOnly,
}

impl DuplicateSourcePolicy {
    /// Stable name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Warn => "warn",
            Self::FirstOnly => "first-only",
        }
    }
}

impl fmt::Display for DuplicateSourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown duplicate policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown duplicate source policy {0:?}; expected accept, warn or first-only")]
pub struct ParsePolicyError(pub String);

impl FromStr for DuplicateSourcePolicy {
    type Err = ParsePolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "accept" => Ok(Self::Accept),
            "warn" => Ok(Self::Warn),
            "first-only" => Ok(Self::FirstOnly),
            other => Err(ParsePolicyError(other.to_owned())),
        }
    }
}

/// Result of [`PartitionFilter::filter`].
#[derive(Debug)]
pub struct FilteredPartitions<S> {
    /// Retained partitions in key order.
    pub retained: BTreeMap<String, S>,
    /// Requested sources matched by no partition, in request order.
    pub missing: Vec<String>,
    /// Keys of partitions flagged as duplicates of an earlier partition of
    /// the same source.
    pub duplicates: Vec<String>,
}

/// Keeps only partitions belonging to the required sources.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use ogs_data::PartitionFilter;
///
/// let partitions = BTreeMap::from([
///     ("A/data.json".to_owned(), 1),
///     ("B/data.json".to_owned(), 2),
///     ("C/data.json".to_owned(), 3),
/// ]);
/// let filtered = PartitionFilter::default().filter(partitions, &["A", "D"]);
///
/// assert_eq!(filtered.retained.keys().collect::<Vec<_>>(), ["A/data.json"]);
/// assert_eq!(filtered.missing, ["D"]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionFilter {
    policy: DuplicateSourcePolicy,
}

impl PartitionFilter {
    /// Filter applying `policy` to duplicate sources.
    #[must_use]
    pub const fn new(policy: DuplicateSourcePolicy) -> Self {
        Self { policy }
    }

    /// The configured duplicate policy.
    #[must_use]
    pub const fn policy(&self) -> DuplicateSourcePolicy {
        self.policy
    }

    /// Retain the partitions whose leading segment is a required source.
    ///
    /// Required sources without a partition are logged and reported in
    /// [`FilteredPartitions::missing`]; they are not errors.
    pub fn filter<S, R>(
        &self,
        partitions: BTreeMap<String, S>,
        required: &[R],
    ) -> FilteredPartitions<S>
    where
        R: AsRef<str>,
    {
        let required_set: BTreeSet<&str> = required.iter().map(AsRef::as_ref).collect();
        let present: BTreeSet<&str> = partitions.keys().map(|key| leading_segment(key)).collect();

        let mut missing = Vec::new();
        let mut reported = BTreeSet::new();
        for source in required.iter().map(AsRef::as_ref) {
            if !present.contains(source) && reported.insert(source) {
                warn!("required source {source} not found in partitions, ignoring");
                missing.push(source.to_owned());
            }
        }

        let mut retained = BTreeMap::new();
        let mut duplicates = Vec::new();
        let mut seen_sources = BTreeSet::new();
        for (key, partition) in partitions {
            let source = leading_segment(&key).to_owned();
            if !required_set.contains(source.as_str()) {
                continue;
            }
            if seen_sources.insert(source.clone()) {
                retained.insert(key, partition);
                continue;
            }
            match self.policy {
                DuplicateSourcePolicy::Accept => {
                    retained.insert(key, partition);
                }
                DuplicateSourcePolicy::Warn => {
                    warn!("source {source} has more than one partition; also loading {key}");
                    duplicates.push(key.clone());
                    retained.insert(key, partition);
                }
                DuplicateSourcePolicy::FirstOnly => {
                    warn!("source {source} has more than one partition; skipping {key}");
                    duplicates.push(key);
                }
            }
        }

        FilteredPartitions {
            retained,
            missing,
            duplicates,
        }
    }
}
