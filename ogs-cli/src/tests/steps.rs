//! Behaviour-driven step definitions driving the stage and load commands.

use super::helpers::{DATABASE, Workspace, record_json, write_utf8, write_values};
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use std::cell::RefCell;

/// Scenario state shared by the stage and load steps.
#[derive(Debug)]
struct CommandWorld {
    workspace: Workspace,
    output: RefCell<Vec<u8>>,
    outcome: RefCell<Option<Result<(), CliError>>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            output: RefCell::new(Vec::new()),
            outcome: RefCell::new(None),
        }
    }

    fn raw_export(&self) -> camino::Utf8PathBuf {
        self.workspace.root().join("gcp_raw.json")
    }

    fn run(&self, args: &[&str]) {
        let mut invocation = vec!["ogs".to_owned()];
        invocation.extend(args.iter().map(|arg| (*arg).to_owned()));
        let mut output = self.output.borrow_mut();
        let outcome = Cli::try_parse_from(invocation)
            .map_err(CliError::ArgumentParsing)
            .and_then(|cli| match cli.command {
                Command::Stage(stage_args) => stage::run_stage_with(stage_args, &mut *output),
                Command::Load(load_args) => load::run_load_with(load_args, &mut *output),
            });
        self.outcome.replace(Some(outcome));
    }

    fn run_load(&self, sources: &[&str]) {
        let staging = self.workspace.staging();
        let database_dir = self.workspace.database_dir();
        let mut args = vec![
            "load",
            "--partitions-dir",
            staging.as_str(),
            "--database",
            DATABASE,
            "--endpoint",
            database_dir.as_str(),
        ];
        for source in sources {
            args.extend(["--source", *source]);
        }
        self.run(&args);
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.outcome.borrow(), |outcome| {
            match outcome.as_ref().expect("command ran") {
                Ok(()) => panic!("expected the command to fail"),
                Err(err) => err,
            }
        })
    }

    fn printed(&self) -> Value {
        serde_json::from_slice(&self.output.borrow()).expect("output is JSON")
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("a raw Global Carbon Project export on disk")]
fn raw_export(#[from(world)] world: &CommandWorld) {
    write_values(
        &world.raw_export(),
        &[
            json!({"Year": 2020, "country_alpha-3": "FRA", "sector": "Coal", "value": 10.0}),
            json!({"Year": 2020, "country_alpha-3": "FRA", "sector": "Bunkers", "value": 1.0}),
        ],
    );
}

#[given("a seeded SQLite store")]
fn seeded_store(#[from(world)] world: &CommandWorld) {
    world.workspace.seed_store(&["gcp", "wri-unfccc"]);
}

#[given("a staged gcp partition")]
fn staged_gcp(#[from(world)] world: &CommandWorld) {
    write_values(
        &world.workspace.staging().join("gcp/data.json"),
        &[record_json("gcp", "FRA")],
    );
}

#[given("a corrupt wri-unfccc partition")]
fn corrupt_partition(#[from(world)] world: &CommandWorld) {
    write_utf8(
        &world.workspace.staging().join("wri-unfccc/data.json"),
        b"[{\"truncated\": ",
    );
}

#[when("I run the stage command with the gcp mapper")]
fn stage_with_mapper(#[from(world)] world: &CommandWorld) {
    let input = world.raw_export();
    let staging = world.workspace.staging();
    world.run(&[
        "stage",
        "--input",
        input.as_str(),
        "--provider",
        "gcp",
        "--output-dir",
        staging.as_str(),
        "--mapper",
        "gcp",
    ]);
}

#[when("I run the stage command without an output directory")]
fn stage_without_output(#[from(world)] world: &CommandWorld) {
    let input = world.raw_export();
    world.run(&["stage", "--input", input.as_str(), "--provider", "gcp"]);
}

#[when("I run the load command for the gcp source")]
fn load_gcp(#[from(world)] world: &CommandWorld) {
    world.run_load(&["gcp"]);
}

#[when("I run the load command for the gcp and wri-unfccc sources")]
fn load_gcp_and_wri(#[from(world)] world: &CommandWorld) {
    world.run_load(&["gcp", "wri-unfccc"]);
}

#[then("the command succeeds")]
fn command_succeeds(#[from(world)] world: &CommandWorld) {
    let outcome = world.outcome.borrow();
    match outcome.as_ref().expect("command ran") {
        Ok(()) => {}
        Err(err) => panic!("command failed: {err}"),
    }
}

#[then("the summary reports one staged record and one unmapped row")]
fn stage_summary(#[from(world)] world: &CommandWorld) {
    let summary = world.printed();
    assert_eq!(summary["partition"], "gcp/data.json");
    assert_eq!(summary["staged"], 1);
    assert_eq!(summary["rejected"], 0);
    assert_eq!(summary["unmapped"], 1);
}

#[then("the gcp partition holds the mapped record")]
fn partition_holds_record(#[from(world)] world: &CommandWorld) {
    let path = world.workspace.staging().join("gcp/data.json");
    let records: Vec<Value> = ogs_data::read_values(&path).expect("read partition");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["date"], "2020-01-01");
    assert_eq!(
        records[0]["emission"]["sector"]["sector_mapped_name"],
        "fossil_emissions_coal"
    );
}

#[then("the CLI reports that the \"output-dir\" flag is missing")]
fn reports_missing_output_dir(#[from(world)] world: &CommandWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_STAGE_OUTPUT_DIR);
            assert_eq!(*env, ENV_STAGE_OUTPUT_DIR);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("the printed report shows the gcp partition as loaded")]
fn gcp_loaded(#[from(world)] world: &CommandWorld) {
    let report = world.printed();
    assert_eq!(report["partitions"]["gcp/data.json"]["status"], "loaded");
    assert_eq!(report["partitions"]["gcp/data.json"]["inserted"], 1);
    assert_eq!(report["inserted"], 1);
}

#[then("the CLI reports that 1 of 2 partitions failed")]
fn reports_failed_partition(#[from(world)] world: &CommandWorld) {
    match &*world.error() {
        CliError::PartitionsFailed { failed, total } => {
            assert_eq!(*failed, 1);
            assert_eq!(*total, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("the printed report shows the wri-unfccc partition as failed")]
fn wri_failed(#[from(world)] world: &CommandWorld) {
    let report = world.printed();
    let outcome = &report["partitions"]["wri-unfccc/data.json"];
    assert_eq!(outcome["status"], "failed");
    let message = outcome["message"].as_str().expect("failure message");
    assert!(message.contains("wri-unfccc/data.json"), "got {message}");
}

#[then("the store holds one emission document")]
fn store_holds_one(#[from(world)] world: &CommandWorld) {
    assert_eq!(world.workspace.emission_count(), 1);
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $feature:literal, $scenario_title:literal) => {
        #[scenario(path = $feature, name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(
    staging_mapped_records,
    "tests/features/stage_command.feature",
    "staging mapped records into a partition"
);
register_command_scenario!(
    missing_output_dir,
    "tests/features/stage_command.feature",
    "reporting a missing output directory"
);
register_command_scenario!(
    loading_into_sqlite,
    "tests/features/load_command.feature",
    "loading a staged partition into SQLite"
);
register_command_scenario!(
    reporting_failed_partition,
    "tests/features/load_command.feature",
    "reporting a failed partition"
);
