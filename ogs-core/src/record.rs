//! Canonical emissions envelope produced by provider row mappers.
//!
//! A [`Record`] is the unit that flows through validation, partitioning and
//! loading. Records are immutable once mapped: downstream stages only read
//! them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One emissions observation in the canonical envelope.
///
/// # Examples
///
/// ```
/// use ogs_core::Record;
///
/// let record: Record = serde_json::from_value(serde_json::json!({
///     "data_source": {"name": "gcp"},
///     "geo_component": {"identifier": {"id": "FRA", "type": "alpha3"}},
///     "date": "2020-01-01",
///     "emission": {
///         "gas": "CO2",
///         "value": 10.0,
///         "unit": "MtC",
///         "sector": {
///             "sector_origin_name": "Coal",
///             "sector_mapped_name": "fossil_emissions_coal"
///         }
///     }
/// }))?;
/// assert_eq!(record.geo_component.identifier.kind, "alpha3");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Provider that published the observation.
    pub data_source: DataSource,
    /// Geographic entity the observation applies to.
    pub geo_component: GeoComponent,
    /// Calendar day of the observation, serialised as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// The measured emission.
    pub emission: Emission,
}

/// Provider description embedded in every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Business key matched against the data-source reference collection.
    pub name: String,
    /// Landing page of the published dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Provider-specific qualifiers such as the reporting scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl DataSource {
    /// Build a data source carrying only its name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: None,
            properties: None,
        }
    }
}

/// Geographic scope of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoComponent {
    /// Granularity label, e.g. `Country`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    /// Free-form identifier resolved against the geo-component references.
    pub identifier: GeoIdentifier,
}

impl GeoComponent {
    /// Build a geo component from an identifier type and value.
    #[must_use]
    pub fn identified_by(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scale: None,
            identifier: GeoIdentifier {
                id: id.into(),
                kind: kind.into(),
            },
        }
    }
}

/// Typed identifier such as an ISO 3166 alpha-3 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoIdentifier {
    /// Identifier value, e.g. `FRA`.
    pub id: String,
    /// Identifier scheme, e.g. `alpha3`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Quantified emission of one gas for one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Gas code, e.g. `CO2`.
    pub gas: String,
    /// Emitted quantity expressed in [`Emission::unit`]. Kept as a JSON
    /// number so integer quantities are stored as integers.
    pub value: Number,
    /// Unit of [`Emission::value`].
    pub unit: Unit,
    /// Provider sector and its mapped canonical name.
    pub sector: Sector,
}

/// Unit annotation; providers emit either a bare symbol or a descriptor
/// object such as `{"unit_used": "MtC"}`.
///
/// Descriptor objects are carried through to storage as published, whatever
/// their field types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Unit {
    /// Bare unit symbol.
    Symbol(String),
    /// Structured unit description.
    Descriptor(Map<String, Value>),
}

impl Unit {
    /// Build the descriptor form `{"unit_used": <symbol>}` used by mappers.
    #[must_use]
    pub fn used(symbol: impl Into<String>) -> Self {
        let mut descriptor = Map::new();
        descriptor.insert("unit_used".to_owned(), Value::String(symbol.into()));
        Self::Descriptor(descriptor)
    }

    /// The unit symbol: the bare form, or a string `unit_used` field.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            Self::Descriptor(descriptor) => descriptor.get("unit_used").and_then(Value::as_str),
        }
    }
}

/// Sector classification carried through to storage unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Sector label as published by the provider.
    pub sector_origin_name: String,
    /// Canonical sector identifier.
    pub sector_mapped_name: String,
}

impl Sector {
    /// Pair a provider sector label with its canonical name.
    #[must_use]
    pub fn new(origin: impl Into<String>, mapped: impl Into<String>) -> Self {
        Self {
            sector_origin_name: origin.into(),
            sector_mapped_name: mapped.into(),
        }
    }
}
