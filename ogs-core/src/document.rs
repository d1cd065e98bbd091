//! Flat storage documents and their construction from records.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Number;
use thiserror::Error;

use crate::{DataSource, DocumentId, GeoComponent, Record, ReferenceResolver, Sector, Unit};

/// Emission document written to the emissions collection.
///
/// Documents can only be produced by [`build_document`], which guarantees
/// that both foreign references resolved against the batch snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    geo_component_id: DocumentId,
    data_source_id: DocumentId,
    date: NaiveDate,
    gas: String,
    value: Number,
    unit: Unit,
    sector: Sector,
}

impl Document {
    /// Resolved geo-component reference.
    #[must_use]
    pub const fn geo_component_id(&self) -> DocumentId {
        self.geo_component_id
    }

    /// Resolved data-source reference.
    #[must_use]
    pub const fn data_source_id(&self) -> DocumentId {
        self.data_source_id
    }

    /// Observation day.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Gas code.
    #[must_use]
    pub fn gas(&self) -> &str {
        &self.gas
    }

    /// Emitted quantity.
    #[must_use]
    pub const fn value(&self) -> &Number {
        &self.value
    }

    /// Unit of [`Document::value`].
    #[must_use]
    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Sector classification.
    #[must_use]
    pub const fn sector(&self) -> &Sector {
        &self.sector
    }
}

/// Category of a [`ResolutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionErrorKind {
    /// No geo-component reference matched the record's identifier.
    MissingGeoComponent,
    /// No data-source reference matched the record's source name.
    MissingDataSource,
}

/// A record whose foreign references could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The record's geo component is unknown to the snapshot.
    #[error(
        "geo_component not found: {}={}",
        .geo_component.identifier.kind,
        .geo_component.identifier.id
    )]
    MissingGeoComponent {
        /// The unresolved geo component.
        geo_component: GeoComponent,
    },
    /// The record's data source is unknown to the snapshot.
    #[error("data_source not found: {}", .data_source.name)]
    MissingDataSource {
        /// The unresolved data source.
        data_source: DataSource,
    },
}

impl ResolutionError {
    /// Report which reference failed to resolve.
    #[must_use]
    pub const fn kind(&self) -> ResolutionErrorKind {
        match self {
            Self::MissingGeoComponent { .. } => ResolutionErrorKind::MissingGeoComponent,
            Self::MissingDataSource { .. } => ResolutionErrorKind::MissingDataSource,
        }
    }
}

/// Resolve a record's references and flatten it into a [`Document`].
///
/// The geo component is resolved first, so a record missing both references
/// reports [`ResolutionError::MissingGeoComponent`].
///
/// # Errors
/// Returns [`ResolutionError`] when either reference is absent from the
/// resolver's snapshot.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use ogs_core::{
///     DocumentId, Record, ReferenceDataSource, ReferenceGeoComponent, ReferenceSnapshot,
///     build_document,
/// };
///
/// let snapshot = ReferenceSnapshot::new(
///     vec![ReferenceGeoComponent {
///         id: DocumentId::new(1),
///         identifiers: BTreeMap::from([("alpha3".into(), "FRA".into())]),
///     }],
///     vec![ReferenceDataSource { id: DocumentId::new(9), name: "gcp".into() }],
/// );
/// let record: Record = serde_json::from_value(serde_json::json!({
///     "data_source": {"name": "gcp"},
///     "geo_component": {"identifier": {"id": "FRA", "type": "alpha3"}},
///     "date": "2020-01-01",
///     "emission": {
///         "gas": "CO2",
///         "value": 10.0,
///         "unit": "MtC",
///         "sector": {"sector_origin_name": "Coal", "sector_mapped_name": "fossil_emissions_coal"}
///     }
/// }))?;
///
/// let document = build_document(&record, &snapshot.resolver())?;
/// assert_eq!(document.geo_component_id(), DocumentId::new(1));
/// assert_eq!(document.data_source_id(), DocumentId::new(9));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn build_document(
    record: &Record,
    resolver: &ReferenceResolver<'_>,
) -> Result<Document, ResolutionError> {
    let geo_component_id = resolver
        .resolve_geo_component(&record.geo_component)
        .ok_or_else(|| ResolutionError::MissingGeoComponent {
            geo_component: record.geo_component.clone(),
        })?;
    let data_source_id = resolver
        .resolve_data_source(&record.data_source)
        .ok_or_else(|| ResolutionError::MissingDataSource {
            data_source: record.data_source.clone(),
        })?;

    let emission = &record.emission;
    Ok(Document {
        geo_component_id,
        data_source_id,
        date: record.date,
        gas: emission.gas.clone(),
        value: emission.value.clone(),
        unit: emission.unit.clone(),
        sector: emission.sector.clone(),
    })
}
