//! Provider row mappers.
//!
//! Each provider publishes its own table layout. Mappers consume rows that
//! have already been reshaped to long format (one emission per row) and
//! produce canonical [`Record`]s. Rows a provider marks as out of scope are
//! skipped; rows that cannot be mapped are reported and dropped.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use log::{error, warn};
use ogs_core::Record;
use serde_json::{Map, Number, Value};
use thiserror::Error;

mod gcp;
mod wri_unfccc;

pub use gcp::GcpMapper;
pub use wri_unfccc::WriUnfcccMapper;

/// One long-format provider row.
pub type Row = Map<String, Value>;

/// Errors raised while mapping a single row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A required column is absent or null.
    #[error("row has no value for {column}")]
    MissingColumn {
        /// Column name.
        column: &'static str,
    },
    /// A column holds a value of the wrong shape.
    #[error("column {column} should be {expected}, found {found}")]
    InvalidColumn {
        /// Column name.
        column: &'static str,
        /// Expected shape.
        expected: &'static str,
        /// Offending value rendered as JSON.
        found: String,
    },
    /// The provider sector has no canonical mapping.
    #[error("{provider} sector {sector:?} has no mapping")]
    UnknownSector {
        /// Provider key.
        provider: &'static str,
        /// Provider sector label.
        sector: String,
    },
    /// The provider gas has no canonical mapping.
    #[error("{provider} gas {gas:?} has no mapping")]
    UnknownGas {
        /// Provider key.
        provider: &'static str,
        /// Provider gas label.
        gas: String,
    },
}

/// Converts provider rows into canonical records.
pub trait RowMapper {
    /// Provider key used as the data-source name and partition key.
    fn provider(&self) -> &'static str;

    /// Whether the row is in scope; out-of-scope rows are skipped silently.
    fn accepts(&self, row: &Row) -> bool {
        let _ = row;
        true
    }

    /// Map one in-scope row.
    ///
    /// # Errors
    /// Returns [`MappingError`] when the row lacks a column or uses a label
    /// without a canonical mapping.
    fn map_row(&self, row: &Row) -> Result<Record, MappingError>;
}

/// A row that could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow {
    /// Zero-based row index.
    pub index: usize,
    /// Why mapping failed.
    pub error: MappingError,
}

/// Outcome of [`map_rows`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRows {
    /// Records in row order.
    pub records: Vec<Record>,
    /// Rows the mapper declared out of scope.
    pub skipped: usize,
    /// Rows that could not be mapped.
    pub failed: Vec<FailedRow>,
}

/// Map every row, logging and dropping the ones that fail.
pub fn map_rows<M: RowMapper + ?Sized>(mapper: &M, rows: &[Row]) -> MappedRows {
    let mut mapped = MappedRows::default();
    for (index, row) in rows.iter().enumerate() {
        if !mapper.accepts(row) {
            mapped.skipped += 1;
            continue;
        }
        match mapper.map_row(row) {
            Ok(record) => mapped.records.push(record),
            Err(err) => {
                error!("{}: failed to map row {index}: {err}", mapper.provider());
                mapped.failed.push(FailedRow { index, error: err });
            }
        }
    }
    if !mapped.failed.is_empty() {
        warn!(
            "{}: failed to map {} rows (out of {})",
            mapper.provider(),
            mapped.failed.len(),
            rows.len()
        );
    }
    mapped
}

/// Providers with a bundled row mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Global Carbon Project national fossil emissions.
    Gcp,
    /// Climate Watch compilation of UNFCCC inventories.
    WriUnfccc,
}

impl Provider {
    /// Provider key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gcp => gcp::PROVIDER,
            Self::WriUnfccc => wri_unfccc::PROVIDER,
        }
    }

    /// The mapper for this provider.
    #[must_use]
    pub fn mapper(self) -> Box<dyn RowMapper> {
        match self {
            Self::Gcp => Box::new(GcpMapper),
            Self::WriUnfccc => Box::new(WriUnfcccMapper),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown provider key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider {0:?}; expected gcp or wri-unfccc")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            gcp::PROVIDER => Ok(Self::Gcp),
            wri_unfccc::PROVIDER => Ok(Self::WriUnfccc),
            other => Err(ParseProviderError(other.to_owned())),
        }
    }
}

fn required<'row>(row: &'row Row, column: &'static str) -> Result<&'row Value, MappingError> {
    match row.get(column) {
        None | Some(Value::Null) => Err(MappingError::MissingColumn { column }),
        Some(value) => Ok(value),
    }
}

fn text<'row>(row: &'row Row, column: &'static str) -> Result<&'row str, MappingError> {
    let value = required(row, column)?;
    value.as_str().ok_or_else(|| invalid(column, "a string", value))
}

fn number(row: &Row, column: &'static str) -> Result<f64, MappingError> {
    let value = required(row, column)?;
    value.as_f64().ok_or_else(|| invalid(column, "a number", value))
}

/// The column's JSON number as published, integer or not.
fn quantity(row: &Row, column: &'static str) -> Result<Number, MappingError> {
    match required(row, column)? {
        Value::Number(number) => Ok(number.clone()),
        other => Err(invalid(column, "a number", other)),
    }
}

/// Years arrive as integers, or as strings when they were column headers
/// before the table was melted.
fn first_of_year(row: &Row, column: &'static str) -> Result<NaiveDate, MappingError> {
    let value = required(row, column)?;
    let year = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    };
    year.and_then(|year| i32::try_from(year).ok())
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .ok_or_else(|| invalid(column, "a calendar year", value))
}

fn invalid(column: &'static str, expected: &'static str, found: &Value) -> MappingError {
    MappingError::InvalidColumn {
        column,
        expected,
        found: found.to_string(),
    }
}
