//! Batch-scoped reference data and identifier resolution.
//!
//! The store does not enforce foreign keys between emissions and the two
//! reference collections, so every batch takes a [`ReferenceSnapshot`] once
//! and resolves each record against it through a [`ReferenceResolver`].
//! The snapshot owns its entities, so later changes to the store are never
//! observed mid-batch.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{DataSource, GeoComponent};

/// Opaque identifier assigned by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(i64);

impl DocumentId {
    /// Wrap a store-assigned identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Return the raw store identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Geographic entity from the reference collection.
///
/// An entity may be known under several identifier schemes at once, for
/// example both `alpha2` and `alpha3` codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceGeoComponent {
    /// Store identifier.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Identifier scheme mapped to identifier value.
    pub identifiers: BTreeMap<String, String>,
}

/// Data-source entity from the reference collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDataSource {
    /// Store identifier.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Business key; assumed unique within the collection.
    pub name: String,
}

/// Immutable copy of both reference collections for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSnapshot {
    geo_components: Vec<ReferenceGeoComponent>,
    data_sources: Vec<ReferenceDataSource>,
}

impl ReferenceSnapshot {
    /// Capture the reference entities in store order.
    #[must_use]
    pub const fn new(
        geo_components: Vec<ReferenceGeoComponent>,
        data_sources: Vec<ReferenceDataSource>,
    ) -> Self {
        Self {
            geo_components,
            data_sources,
        }
    }

    /// Geographic entities in snapshot order.
    #[must_use]
    pub fn geo_components(&self) -> &[ReferenceGeoComponent] {
        &self.geo_components
    }

    /// Data-source entities in snapshot order.
    #[must_use]
    pub fn data_sources(&self) -> &[ReferenceDataSource] {
        &self.data_sources
    }

    /// Build the lookup indices for this snapshot.
    #[must_use]
    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(self)
    }
}

/// Hash-indexed lookups over a [`ReferenceSnapshot`].
///
/// Geo components are indexed by identifier type, then identifier value;
/// data sources by name. When several entities share a key the first one in
/// snapshot order wins.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use ogs_core::{
///     DataSource, DocumentId, GeoComponent, ReferenceDataSource, ReferenceGeoComponent,
///     ReferenceSnapshot,
/// };
///
/// let snapshot = ReferenceSnapshot::new(
///     vec![ReferenceGeoComponent {
///         id: DocumentId::new(1),
///         identifiers: BTreeMap::from([("alpha3".into(), "FRA".into())]),
///     }],
///     vec![ReferenceDataSource { id: DocumentId::new(9), name: "gcp".into() }],
/// );
/// let resolver = snapshot.resolver();
///
/// let france = GeoComponent::identified_by("alpha3", "FRA");
/// assert_eq!(resolver.resolve_geo_component(&france), Some(DocumentId::new(1)));
/// assert_eq!(resolver.resolve_data_source(&DataSource::named("wri")), None);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceResolver<'snapshot> {
    geo_components: HashMap<&'snapshot str, HashMap<&'snapshot str, DocumentId>>,
    data_sources: HashMap<&'snapshot str, DocumentId>,
}

impl<'snapshot> ReferenceResolver<'snapshot> {
    /// Index the supplied snapshot.
    #[must_use]
    pub fn new(snapshot: &'snapshot ReferenceSnapshot) -> Self {
        let mut geo_components: HashMap<&str, HashMap<&str, DocumentId>> = HashMap::new();
        for entity in &snapshot.geo_components {
            for (kind, value) in &entity.identifiers {
                geo_components
                    .entry(kind.as_str())
                    .or_default()
                    .entry(value.as_str())
                    .or_insert(entity.id);
            }
        }

        let mut data_sources = HashMap::with_capacity(snapshot.data_sources.len());
        for entity in &snapshot.data_sources {
            data_sources.entry(entity.name.as_str()).or_insert(entity.id);
        }

        Self {
            geo_components,
            data_sources,
        }
    }

    /// Resolve a record's geo component; `None` when no entity carries the
    /// identifier type or no value matches.
    #[must_use]
    pub fn resolve_geo_component(&self, geo_component: &GeoComponent) -> Option<DocumentId> {
        let identifier = &geo_component.identifier;
        self.geo_components
            .get(identifier.kind.as_str())?
            .get(identifier.id.as_str())
            .copied()
    }

    /// Resolve a record's data source by exact name.
    #[must_use]
    pub fn resolve_data_source(&self, data_source: &DataSource) -> Option<DocumentId> {
        self.data_sources.get(data_source.name.as_str()).copied()
    }
}
