//! Structural validation of staged records.
//!
//! Every candidate is checked on its own: a record that violates the schema,
//! or that passes it but cannot be decoded into a [`Record`], is logged and
//! dropped. Nothing raised for a single record escapes [`SchemaValidator::validate`].

use std::fmt;

use log::{error, warn};
use ogs_core::Record;
use serde_json::Value;
use thiserror::Error;

const STAGING_SCHEMA: &str = include_str!("../schemas/staging.schema.json");

/// Errors raised while preparing a schema; never raised per record.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document is not valid JSON.
    #[error("failed to parse JSON schema")]
    Parse {
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The schema is JSON but not a usable JSON Schema.
    #[error("invalid JSON schema: {message}")]
    Compile {
        /// Compiler diagnostic.
        message: String,
    },
}

/// Reason a single candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordRejection {
    /// The candidate violates the schema.
    #[error("schema violation: {}", .violations.join("; "))]
    Schema {
        /// One entry per violation, prefixed with the instance path.
        violations: Vec<String>,
    },
    /// The candidate satisfies the schema but not the record model.
    #[error("record does not decode: {message}")]
    Decode {
        /// Decoder diagnostic.
        message: String,
    },
}

/// A dropped candidate and its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Zero-based index of the candidate in the validated collection.
    pub index: usize,
    /// Why it was dropped.
    pub reason: RecordRejection,
}

/// Outcome of validating a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Surviving records in input order.
    pub records: Vec<Record>,
    /// Dropped candidates in input order.
    pub rejected: Vec<Rejected>,
}

impl ValidationReport {
    /// Number of dropped candidates.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Compiled JSON Schema used to gate records before partitioning.
///
/// # Examples
///
/// ```
/// use ogs_data::SchemaValidator;
/// use serde_json::json;
///
/// let validator = SchemaValidator::staging()?;
/// let report = validator.validate(vec![json!({"date": "2020-01-01"})]);
///
/// assert!(report.records.is_empty());
/// assert_eq!(report.rejected_count(), 1);
/// # Ok::<(), ogs_data::SchemaError>(())
/// ```
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile an externally supplied schema document.
    ///
    /// Documents without a `$schema` declaration are compiled as draft-07.
    ///
    /// # Errors
    /// Returns [`SchemaError::Compile`] when the document is not a valid schema.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let compiled = if schema.get("$schema").is_some() {
            jsonschema::validator_for(schema)
        } else {
            jsonschema::options()
                .with_draft(jsonschema::Draft::Draft7)
                .build(schema)
        };
        let validator = compiled.map_err(|err| SchemaError::Compile {
            message: err.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// Parse and compile a schema from JSON text.
    ///
    /// # Errors
    /// Returns [`SchemaError::Parse`] for malformed JSON and
    /// [`SchemaError::Compile`] for an unusable schema.
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        let schema: Value =
            serde_json::from_str(raw).map_err(|source| SchemaError::Parse { source })?;
        Self::new(&schema)
    }

    /// Compile the bundled staging schema describing the record envelope.
    ///
    /// # Errors
    /// Only fails if the bundled schema itself is broken.
    pub fn staging() -> Result<Self, SchemaError> {
        Self::from_json_str(STAGING_SCHEMA)
    }

    /// Check one candidate and decode it into a [`Record`].
    ///
    /// # Errors
    /// Returns the [`RecordRejection`] explaining why the candidate was dropped.
    pub fn check(&self, candidate: Value) -> Result<Record, RecordRejection> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(&candidate)
            .map(|err| format!("{}: {err}", err.instance_path))
            .collect();
        if !violations.is_empty() {
            return Err(RecordRejection::Schema { violations });
        }
        serde_json::from_value(candidate).map_err(|err| RecordRejection::Decode {
            message: err.to_string(),
        })
    }

    /// Validate a collection, keeping survivors in input order.
    pub fn validate(&self, candidates: Vec<Value>) -> ValidationReport {
        let total = candidates.len();
        let mut report = ValidationReport::default();
        for (index, candidate) in candidates.into_iter().enumerate() {
            match self.check(candidate) {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    error!("rejected record {index}: {reason}");
                    report.rejected.push(Rejected { index, reason });
                }
            }
        }
        if !report.rejected.is_empty() {
            warn!(
                "failed to validate {} records (out of {total})",
                report.rejected.len()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests;
