//! Behavioural tests for resolving records into storage documents.

use std::{cell::RefCell, collections::BTreeMap};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use ogs_core::{
    DataSource, Document, DocumentId, Emission, GeoComponent, Record, ReferenceDataSource,
    ReferenceGeoComponent, ReferenceSnapshot, ResolutionError, ResolutionErrorKind, Sector, Unit,
    build_document,
};

const FRANCE_ID: DocumentId = DocumentId::new(11);
const FRANCE_DUPLICATE_ID: DocumentId = DocumentId::new(12);
const GCP_ID: DocumentId = DocumentId::new(40);

#[derive(Debug, Default)]
struct ResolutionWorld {
    snapshot: RefCell<ReferenceSnapshot>,
    result: RefCell<Option<Result<Document, ResolutionError>>>,
}

impl ResolutionWorld {
    fn document(&self) -> Document {
        self.result
            .borrow()
            .as_ref()
            .expect("build was attempted")
            .as_ref()
            .expect("expected a document")
            .clone()
    }

    fn error_kind(&self) -> ResolutionErrorKind {
        self.result
            .borrow()
            .as_ref()
            .expect("build was attempted")
            .as_ref()
            .expect_err("expected a resolution error")
            .kind()
    }
}

#[fixture]
fn world() -> ResolutionWorld {
    ResolutionWorld::default()
}

fn country(id: DocumentId, alpha3: &str) -> ReferenceGeoComponent {
    ReferenceGeoComponent {
        id,
        identifiers: BTreeMap::from([("alpha3".to_owned(), alpha3.to_owned())]),
    }
}

fn gcp() -> ReferenceDataSource {
    ReferenceDataSource {
        id: GCP_ID,
        name: "GCP".to_owned(),
    }
}

fn record(source: &str, alpha3: &str) -> Record {
    Record {
        data_source: DataSource::named(source),
        geo_component: GeoComponent::identified_by("alpha3", alpha3),
        date: chrono::NaiveDate::from_ymd_opt(2019, 1, 1).expect("valid date"),
        emission: Emission {
            gas: "CO2".to_owned(),
            value: serde_json::Number::from_f64(82.5).expect("finite value"),
            unit: Unit::used("MtC"),
            sector: Sector::new("Total", "total"),
        },
    }
}

#[given("a snapshot holding France and the Global Carbon Project")]
fn known_references(#[from(world)] world: &ResolutionWorld) {
    world
        .snapshot
        .replace(ReferenceSnapshot::new(vec![country(FRANCE_ID, "FRA")], vec![gcp()]));
}

#[given("a snapshot where two entities claim the code FRA")]
fn duplicated_references(#[from(world)] world: &ResolutionWorld) {
    world.snapshot.replace(ReferenceSnapshot::new(
        vec![
            country(FRANCE_ID, "FRA"),
            country(FRANCE_DUPLICATE_ID, "FRA"),
        ],
        vec![gcp()],
    ));
}

fn build(world: &ResolutionWorld, source: &str, alpha3: &str) {
    let snapshot = world.snapshot.borrow();
    let outcome = build_document(&record(source, alpha3), &snapshot.resolver());
    world.result.replace(Some(outcome));
}

#[when("I build a document for a Global Carbon Project record about France")]
fn build_gcp_france(#[from(world)] world: &ResolutionWorld) {
    build(world, "GCP", "FRA");
}

#[when("I build a document for a WRI record about France")]
fn build_wri_france(#[from(world)] world: &ResolutionWorld) {
    build(world, "WRI", "FRA");
}

#[when("I build a document for a Global Carbon Project record about Germany")]
fn build_gcp_germany(#[from(world)] world: &ResolutionWorld) {
    build(world, "GCP", "DEU");
}

#[then("the document points at both reference identifiers")]
fn points_at_references(#[from(world)] world: &ResolutionWorld) {
    let document = world.document();
    assert_eq!(document.geo_component_id(), FRANCE_ID);
    assert_eq!(document.data_source_id(), GCP_ID);
    assert_eq!(document.gas(), "CO2");
}

#[then("the document points at the first matching entity")]
fn points_at_first_entity(#[from(world)] world: &ResolutionWorld) {
    assert_eq!(world.document().geo_component_id(), FRANCE_ID);
}

#[then("the build fails because the data source is missing")]
fn missing_data_source(#[from(world)] world: &ResolutionWorld) {
    assert_eq!(world.error_kind(), ResolutionErrorKind::MissingDataSource);
}

#[then("the build fails because the geo component is missing")]
fn missing_geo_component(#[from(world)] world: &ResolutionWorld) {
    assert_eq!(world.error_kind(), ResolutionErrorKind::MissingGeoComponent);
}

macro_rules! register_resolution_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/reference_resolution.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ResolutionWorld) {
            let _ = world;
        }
    };
}

register_resolution_scenario!(
    flattening_known_references,
    "flattening a record with known references"
);
register_resolution_scenario!(
    rejecting_unknown_provider,
    "rejecting a record from an unknown provider"
);
register_resolution_scenario!(
    rejecting_unknown_country,
    "rejecting a record for an unknown country"
);
register_resolution_scenario!(
    preferring_first_duplicate,
    "preferring the first of two entities sharing an identifier"
);
