//! Focused unit tests covering stage CLI configuration and execution.

use super::helpers::{Workspace, invalid_record_json, record_json, write_utf8, write_values};
use super::*;
use crate::stage::{StageArgs, StageConfig, config_from_layers_for_test, execute_stage};
use camino::Utf8PathBuf;
use ogs_data::{PartitionedDataset, Provider, RecordSource};
use rstest::rstest;
use serde_json::json;

fn complete_args() -> StageArgs {
    StageArgs {
        input: Some(Utf8PathBuf::from("records.json")),
        provider: vec!["gcp".to_owned()],
        output_dir: Some(Utf8PathBuf::from("staging")),
        ..StageArgs::default()
    }
}

#[derive(Debug, Copy, Clone)]
enum Omit {
    Input,
    Provider,
    OutputDir,
}

#[rstest]
#[case::input(Omit::Input, ARG_STAGE_INPUT, ENV_STAGE_INPUT)]
#[case::provider(Omit::Provider, ARG_STAGE_PROVIDER, ENV_STAGE_PROVIDER)]
#[case::output_dir(Omit::OutputDir, ARG_STAGE_OUTPUT_DIR, ENV_STAGE_OUTPUT_DIR)]
fn converting_without_required_fields_errors(
    #[case] omit: Omit,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let mut args = complete_args();
    match omit {
        Omit::Input => args.input = None,
        Omit::Provider => args.provider.clear(),
        Omit::OutputDir => args.output_dir = None,
    }

    let err = StageConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn mapper_names_are_parsed() {
    let args = StageArgs {
        mapper: Some("wri-unfccc".to_owned()),
        ..complete_args()
    };
    let config = StageConfig::try_from(args).expect("config should build");
    assert_eq!(config.mapper, Some(Provider::WriUnfccc));

    let args = StageArgs {
        mapper: Some("edgar".to_owned()),
        ..complete_args()
    };
    let err = StageConfig::try_from(args).expect_err("unknown mapper");
    assert!(matches!(err, CliError::UnknownMapper(_)), "got {err:?}");
}

#[rstest]
fn validate_sources_reports_missing_and_non_file_inputs() {
    let workspace = Workspace::new();
    let mut config = StageConfig::try_from(complete_args()).expect("config should build");

    config.input = workspace.root().join("absent.json");
    let err = config.validate_sources().expect_err("missing input");
    assert!(
        matches!(err, CliError::MissingSourceFile { field: ARG_STAGE_INPUT, .. }),
        "got {err:?}"
    );

    config.input = workspace.root().to_path_buf();
    let err = config.validate_sources().expect_err("directory input");
    assert!(
        matches!(err, CliError::SourcePathNotFile { field: ARG_STAGE_INPUT, .. }),
        "got {err:?}"
    );
}

#[rstest]
fn stages_valid_records_and_counts_rejections() {
    let workspace = Workspace::new();
    let input = workspace.root().join("records.jsonl");
    let lines = [
        record_json("gcp", "FRA"),
        invalid_record_json(),
        record_json("gcp", "DEU"),
    ]
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n");
    write_utf8(&input, lines.as_bytes());

    let config = StageConfig {
        input,
        partition_keys: vec!["wri-unfccc".to_owned(), "UNFCCC_AI".to_owned()],
        output_dir: workspace.staging(),
        schema: None,
        mapper: None,
    };
    let summary = execute_stage(&config).expect("stage should succeed");

    assert_eq!(summary.partition, "wri-unfccc/UNFCCC_AI/data.json");
    assert_eq!(summary.path, workspace.staging().join("wri-unfccc/UNFCCC_AI/data.json"));
    assert_eq!(summary.staged, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.unmapped, 0);
}

#[rstest]
fn maps_raw_provider_rows_before_validation() {
    let workspace = Workspace::new();
    let input = workspace.root().join("gcp.json");
    write_values(
        &input,
        &[
            json!({"Year": 2019, "country_alpha-3": "FRA", "sector": "Coal", "value": 36.64}),
            json!({"Year": 2019, "country_alpha-3": null, "sector": "Coal", "value": 1.0}),
            json!({"Year": 2019, "country_alpha-3": "FRA", "sector": "Bunkers", "value": 1.0}),
            json!("not a row"),
        ],
    );

    let config = StageConfig {
        input,
        partition_keys: vec!["gcp".to_owned()],
        output_dir: workspace.staging(),
        schema: None,
        mapper: Some(Provider::Gcp),
    };
    let summary = execute_stage(&config).expect("stage should succeed");

    assert_eq!(summary.staged, 1);
    assert_eq!(summary.unmapped, 3);
    let partitions = PartitionedDataset::discover(&workspace.staging())
        .expect("discover")
        .into_partitions();
    let records = partitions["gcp/data.json"].load().expect("load partition");
    assert_eq!(records[0].emission.sector.sector_mapped_name, "fossil_emissions_coal");
}

#[rstest]
fn custom_schemas_replace_the_bundled_one() {
    let workspace = Workspace::new();
    let input = workspace.root().join("records.json");
    write_values(&input, &[record_json("gcp", "FRA")]);
    let schema = workspace.root().join("strict.schema.json");
    write_utf8(
        &schema,
        br#"{"type": "object", "required": ["data_source", "provenance"]}"#,
    );

    let config = StageConfig {
        input,
        partition_keys: vec!["gcp".to_owned()],
        output_dir: workspace.staging(),
        schema: Some(schema),
        mapper: None,
    };
    let summary = execute_stage(&config).expect("stage should succeed");

    assert_eq!(summary.staged, 0);
    assert_eq!(summary.rejected, 1);
}

#[rstest]
fn unusable_schemas_fail_before_staging() {
    let workspace = Workspace::new();
    let input = workspace.root().join("records.json");
    write_values(&input, &[record_json("gcp", "FRA")]);
    let schema = workspace.root().join("broken.schema.json");
    write_utf8(&schema, b"{ not json");

    let config = StageConfig {
        input,
        partition_keys: vec!["gcp".to_owned()],
        output_dir: workspace.staging(),
        schema: Some(schema),
        mapper: None,
    };
    let err = execute_stage(&config).expect_err("schema should not parse");

    assert!(matches!(err, CliError::InvalidSchema(_)), "got {err:?}");
    assert!(!workspace.staging().exists());
}

#[rstest]
#[case::parent(vec![".."])]
#[case::nested_parent(vec!["gcp", "../.."])]
#[case::empty(vec![""])]
fn provider_keys_cannot_leave_the_output_dir(#[case] keys: Vec<&str>) {
    let workspace = Workspace::new();
    let input = workspace.root().join("records.json");
    write_values(&input, &[record_json("gcp", "FRA")]);

    let config = StageConfig {
        input,
        partition_keys: keys.into_iter().map(str::to_owned).collect(),
        output_dir: workspace.staging(),
        schema: None,
        mapper: None,
    };
    let err = execute_stage(&config).expect_err("unsafe provider key");

    assert!(matches!(err, CliError::InvalidPartitionKey(_)), "got {err:?}");
    assert!(!workspace.root().join("data.json").exists());
    assert!(!workspace.staging().exists());
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "input": 42 }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "input": "from-file.json",
            "provider": ["gcp"],
            "output_dir": "file-staging",
            "mapper": "gcp",
        }),
        None,
    );
    composer.push_environment(json!({ "output_dir": "env-staging" }));
    composer.push_cli(json!({ "input": "from-cli.json" }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.input, "from-cli.json");
    assert_eq!(config.partition_keys, ["gcp"]);
    assert_eq!(config.output_dir, "env-staging");
    assert_eq!(config.mapper, Some(Provider::Gcp));
}
