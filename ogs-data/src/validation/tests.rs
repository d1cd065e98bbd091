//! Unit tests for schema validation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn validator() -> SchemaValidator {
    SchemaValidator::staging().expect("bundled schema compiles")
}

fn candidate() -> Value {
    json!({
        "data_source": {"name": "gcp", "link": "https://www.globalcarbonproject.org/"},
        "geo_component": {"scale": "Country", "identifier": {"id": "FRA", "type": "alpha3"}},
        "date": "2019-01-01",
        "emission": {
            "gas": "CO2",
            "value": 82.5,
            "unit": {"unit_used": "MtC"},
            "sector": {"sector_origin_name": "Coal", "sector_mapped_name": "fossil_emissions_coal"}
        }
    })
}

fn with(mut value: Value, pointer: &str, replacement: Value) -> Value {
    *value
        .pointer_mut(pointer)
        .unwrap_or_else(|| panic!("fixture has no field at {pointer}")) = replacement;
    value
}

fn without(mut value: Value, parent: &str, field: &str) -> Value {
    value
        .pointer_mut(parent)
        .and_then(Value::as_object_mut)
        .unwrap_or_else(|| panic!("fixture has no object at {parent}"))
        .remove(field);
    value
}

#[rstest]
fn accepts_canonical_record(validator: SchemaValidator) {
    let report = validator.validate(vec![candidate()]);
    assert_eq!(report.records.len(), 1);
    assert!(report.rejected.is_empty());
    assert_eq!(report.records[0].data_source.name, "gcp");
}

#[rstest]
#[case::string_value(with(candidate(), "/emission/value", json!("82.5")))]
#[case::slash_date(with(candidate(), "/date", json!("2019/01/01")))]
#[case::unknown_identifier_type(with(candidate(), "/geo_component/identifier/type", json!("iso")))]
#[case::numeric_unit(with(candidate(), "/emission/unit", json!(12)))]
#[case::missing_gas(without(candidate(), "/emission", "gas"))]
#[case::missing_data_source(without(candidate(), "", "data_source"))]
fn rejects_schema_violations(validator: SchemaValidator, #[case] bad: Value) {
    let report = validator.validate(vec![bad]);
    assert!(report.records.is_empty());
    assert!(matches!(
        report.rejected.as_slice(),
        [Rejected { index: 0, reason: RecordRejection::Schema { .. } }]
    ));
}

#[rstest]
fn rejects_records_that_match_schema_but_not_calendar(validator: SchemaValidator) {
    let bad = with(candidate(), "/date", json!("2019-02-30"));
    let err = validator.check(bad).expect_err("impossible date");
    assert!(matches!(err, RecordRejection::Decode { .. }), "got {err:?}");
}

#[rstest]
fn keeps_survivors_in_input_order(validator: SchemaValidator) {
    let candidates = vec![
        with(candidate(), "/geo_component/identifier/id", json!("FRA")),
        with(candidate(), "/emission/value", json!(null)),
        with(candidate(), "/geo_component/identifier/id", json!("DEU")),
        json!("not an object"),
        with(candidate(), "/geo_component/identifier/id", json!("ITA")),
    ];

    let report = validator.validate(candidates);

    let ids: Vec<&str> = report
        .records
        .iter()
        .map(|record| record.geo_component.identifier.id.as_str())
        .collect();
    assert_eq!(ids, vec!["FRA", "DEU", "ITA"]);
    let rejected: Vec<usize> = report.rejected.iter().map(|entry| entry.index).collect();
    assert_eq!(rejected, vec![1, 3]);
    assert_eq!(report.rejected_count(), 2);
}

#[rstest]
fn schema_violations_name_the_offending_path(validator: SchemaValidator) {
    let bad = with(candidate(), "/emission/value", json!("lots"));
    let err = validator.check(bad).expect_err("string value");
    assert!(err.to_string().contains("/emission/value"), "message: {err}");
}

#[rstest]
fn accepts_external_schemas() {
    let validator = SchemaValidator::new(&json!({"type": "object"})).expect("compile schema");
    let report = validator.validate(vec![json!({"date": "2019-01-01"})]);
    assert!(report.records.is_empty(), "typed decode still applies");
    assert!(matches!(
        report.rejected[0].reason,
        RecordRejection::Decode { .. }
    ));
}

#[rstest]
#[case::not_json("{ not json")]
#[case::bad_type(r#"{"type": "no-such-type"}"#)]
fn invalid_schemas_fail_at_construction(#[case] raw: &str) {
    assert!(SchemaValidator::from_json_str(raw).is_err());
}

#[rstest]
fn unit_descriptors_may_hold_any_json(validator: SchemaValidator) {
    let permissive = SchemaValidator::new(&json!({
        "$schema": "http://json-schema.org/draft-07/schema#"
    }))
    .expect("compile schema");
    let unit = json!({"unit_used": "MtC", "multiplier": 1000, "approximate": true});
    let described = with(candidate(), "/emission/unit", unit.clone());

    for gate in [&permissive, &validator] {
        let record = gate.check(described.clone()).expect("schema accepts the unit");
        assert_eq!(serde_json::to_value(&record.emission.unit).expect("encode unit"), unit);
        assert_eq!(record.emission.unit.symbol(), Some("MtC"));
    }
}

#[rstest]
fn undeclared_schemas_follow_draft_07() {
    let validator = SchemaValidator::new(&json!({
        "type": "object",
        "dependencies": {"provenance": ["reviewed_by"]}
    }))
    .expect("compile schema");
    let unreviewed = json!({"provenance": "inventory", "record": candidate()});

    let err = validator.check(unreviewed).expect_err("draft-07 dependencies apply");
    assert!(matches!(err, RecordRejection::Schema { .. }), "got {err:?}");
}
