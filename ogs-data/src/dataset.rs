//! File-backed datasets: JSON arrays, JSON lines and partition trees.
//!
//! Partition trees store one JSON array of records per partition under
//! `<root>/<key>`, where the key ends in `data.json`. Discovery only lists the
//! files; each partition is read when its [`RecordSource`] is loaded.

use std::{
    collections::BTreeMap,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use ogs_core::Record;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::partition::{InvalidPartitionKey, PARTITION_FILE_NAME, RecordSource, check_partition_key};

/// Errors raised while reading or writing datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be opened.
    #[error("failed to open dataset at {path}")]
    Open {
        /// Dataset path.
        path: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// Reading the file failed part-way.
    #[error("failed to read dataset at {path}")]
    Read {
        /// Dataset path.
        path: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// A JSON document did not parse or decode.
    #[error("failed to parse JSON dataset at {path}")]
    Parse {
        /// Dataset path.
        path: Utf8PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// One line of a JSON-lines file did not parse.
    #[error("failed to parse line {line} of {path}")]
    ParseLine {
        /// Dataset path.
        path: Utf8PathBuf,
        /// One-based line number.
        line: usize,
        /// Parser error.
        #[source]
        source: simd_json::Error,
    },
    /// Writing the file failed.
    #[error("failed to write dataset at {path}")]
    Write {
        /// Dataset path.
        path: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// Serialising the payload failed.
    #[error("failed to serialise dataset for {path}")]
    Serialize {
        /// Dataset path.
        path: Utf8PathBuf,
        /// Serialiser error.
        #[source]
        source: serde_json::Error,
    },
    /// A partition key would escape the partition root.
    #[error(transparent)]
    InvalidPartitionKey(#[from] InvalidPartitionKey),
    /// Walking a partition tree failed.
    #[error("failed to discover partitions under {root}")]
    Discover {
        /// Partition tree root.
        root: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
}

/// On-disk layout of a row or record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// One JSON array holding every item.
    Json,
    /// One JSON value per line.
    JsonLines,
}

impl DatasetFormat {
    /// Pick the format from the file extension; `.jsonl` and `.ndjson` are
    /// JSON lines, everything else is a JSON array.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("jsonl" | "ndjson") => Self::JsonLines,
            _ => Self::Json,
        }
    }
}

/// Read every item of a file, choosing the format from its extension.
///
/// # Errors
/// Returns [`DatasetError`] when the file cannot be opened, read or parsed.
pub fn read_values(path: &Utf8Path) -> Result<Vec<Value>, DatasetError> {
    match DatasetFormat::from_path(path) {
        DatasetFormat::Json => read_json(path),
        DatasetFormat::JsonLines => read_json_lines(path),
    }
}

/// Read a JSON array file.
///
/// # Errors
/// Returns [`DatasetError`] when the file cannot be opened or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, DatasetError> {
    let file = open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON-lines file, skipping blank lines.
///
/// # Errors
/// Returns [`DatasetError::ParseLine`] naming the first malformed line.
pub fn read_json_lines<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, DatasetError> {
    let file = open(path)?;
    parse_json_lines(BufReader::new(file), path)
}

fn parse_json_lines<R, T>(reader: R, path: &Utf8Path) -> Result<Vec<T>, DatasetError>
where
    R: BufRead,
    T: DeserializeOwned,
{
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut bytes = trimmed.as_bytes().to_vec();
        let item = simd_json::from_slice(bytes.as_mut_slice()).map_err(|source| {
            DatasetError::ParseLine {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            }
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Write items as a pretty-printed JSON array, creating parent directories.
///
/// # Errors
/// Returns [`DatasetError`] when the file cannot be created or written.
pub fn write_json<T: Serialize>(path: &Utf8Path, items: &[T]) -> Result<(), DatasetError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, items).map_err(|source| {
        DatasetError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    finish(writer, path)
}

/// Write items as JSON lines, creating parent directories.
///
/// # Errors
/// Returns [`DatasetError`] when the file cannot be created or written.
pub fn write_json_lines<T: Serialize>(path: &Utf8Path, items: &[T]) -> Result<(), DatasetError> {
    let mut writer = create(path)?;
    for item in items {
        serde_json::to_writer(&mut writer, item).map_err(|source| DatasetError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        writer.write_all(b"\n").map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    finish(writer, path)
}

/// Write one partition under `root`, returning the file path.
///
/// # Errors
/// Returns [`DatasetError::InvalidPartitionKey`] when `key` has an empty,
/// `.` or `..` segment, and [`DatasetError`] when the partition file cannot
/// be written.
pub fn write_partition(
    root: &Utf8Path,
    key: &str,
    records: &[Record],
) -> Result<Utf8PathBuf, DatasetError> {
    check_partition_key(key)?;
    let path = root.join(key);
    write_json(&path, records)?;
    Ok(path)
}

fn open(path: &Utf8Path) -> Result<impl Read, DatasetError> {
    ogs_fs::open_utf8_file(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Utf8Path) -> Result<BufWriter<impl Write>, DatasetError> {
    ogs_fs::create_utf8_file(path)
        .map(BufWriter::new)
        .map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn finish(mut writer: BufWriter<impl Write>, path: &Utf8Path) -> Result<(), DatasetError> {
    writer.flush().map_err(|source| DatasetError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// One partition file of a [`PartitionedDataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    path: Utf8PathBuf,
}

impl PartitionFile {
    /// Location of the partition's records.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl RecordSource for PartitionFile {
    fn load(&self) -> Result<Vec<Record>, DatasetError> {
        read_json(&self.path)
    }
}

/// A directory tree of partition files keyed by their relative path.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use ogs_data::{PartitionFilter, PartitionedDataset};
///
/// let dataset = PartitionedDataset::discover(Utf8Path::new("data/staging"))?;
/// let filtered = PartitionFilter::default().filter(dataset.into_partitions(), &["gcp"]);
/// assert!(filtered.retained.keys().all(|key| key.starts_with("gcp/")));
/// # Ok::<(), ogs_data::DatasetError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedDataset {
    root: Utf8PathBuf,
    keys: Vec<String>,
}

impl PartitionedDataset {
    /// List every `data.json` below `root`.
    ///
    /// # Errors
    /// Returns [`DatasetError::Discover`] when the tree cannot be walked.
    pub fn discover(root: &Utf8Path) -> Result<Self, DatasetError> {
        let keys = ogs_fs::find_files_named(root, PARTITION_FILE_NAME)
            .map_err(|source| DatasetError::Discover {
                root: root.to_path_buf(),
                source,
            })?
            .into_iter()
            .map(Utf8PathBuf::into_string)
            .collect();
        Ok(Self {
            root: root.to_path_buf(),
            keys,
        })
    }

    /// Tree root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Partition keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Convert into lazily loaded partitions keyed by partition key.
    #[must_use]
    pub fn into_partitions(self) -> BTreeMap<String, PartitionFile> {
        let root = self.root;
        self.keys
            .into_iter()
            .map(|key| {
                let path = root.join(&key);
                (key, PartitionFile { path })
            })
            .collect()
    }
}
