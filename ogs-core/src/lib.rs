//! Core domain types for the open greenhouse-gas emissions loader.
//!
//! Responsibilities:
//! - Model the canonical [`Record`] envelope shared by every provider.
//! - Resolve record identifiers against a batch-scoped
//!   [`ReferenceSnapshot`] and flatten them into storage [`Document`]s.
//! - Define the [`DocumentStore`] and [`StoreConnector`] seams implemented by
//!   storage backends.
//!
//! Boundaries:
//! - No I/O lives here; file formats and database drivers belong to
//!   `ogs-data`.
//!
//! # Examples
//!
//! ```
//! use ogs_core::{
//!     DataSource, DocumentId, GeoComponent, ReferenceDataSource, ReferenceGeoComponent,
//!     ReferenceSnapshot,
//! };
//!
//! let snapshot = ReferenceSnapshot::new(
//!     vec![ReferenceGeoComponent {
//!         id: DocumentId::new(3),
//!         identifiers: [("alpha3".to_owned(), "FRA".to_owned())].into(),
//!     }],
//!     vec![ReferenceDataSource {
//!         id: DocumentId::new(7),
//!         name: "gcp".to_owned(),
//!     }],
//! );
//! let resolver = snapshot.resolver();
//!
//! let france = GeoComponent::identified_by("alpha3", "FRA");
//! assert_eq!(resolver.resolve_geo_component(&france), Some(DocumentId::new(3)));
//! assert_eq!(resolver.resolve_data_source(&DataSource::named("wri")), None);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod document;
mod record;
mod reference;
mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use config::{CollectionNames, ConnectionConfig, Credentials};
pub use document::{Document, ResolutionError, ResolutionErrorKind, build_document};
pub use record::{DataSource, Emission, GeoComponent, GeoIdentifier, Record, Sector, Unit};
pub use reference::{
    DocumentId, ReferenceDataSource, ReferenceGeoComponent, ReferenceResolver, ReferenceSnapshot,
};
pub use store::{BoxError, DocumentStore, StoreConnector, StoreError};
