//! Stage command: validate records and write them as one partition.

use std::io::{Read, Write};

use camino::Utf8PathBuf;
use clap::Parser;
use log::warn;
use ogs_data::{
    PartitionRouter, Provider, Row, SchemaValidator, map_rows, read_values, stage,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ARG_STAGE_INPUT, ARG_STAGE_MAPPER, ARG_STAGE_OUTPUT_DIR, ARG_STAGE_PROVIDER,
    ARG_STAGE_SCHEMA, CliError, ENV_STAGE_INPUT, ENV_STAGE_OUTPUT_DIR, ENV_STAGE_PROVIDER,
    require_existing, write_json,
};

/// CLI arguments for the `stage` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Validate records from a JSON or JSON-lines file and write \
                 the survivors to <output-dir>/<provider keys>/data.json. \
                 Raw provider rows can be mapped first with --mapper. \
                 Options can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Validate records and write a staged partition"
)]
#[ortho_config(prefix = "OGS")]
pub(crate) struct StageArgs {
    /// JSON array or JSON-lines file holding the candidates.
    #[arg(long = ARG_STAGE_INPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Classification keys forming the partition path; repeat for nesting.
    #[arg(long = ARG_STAGE_PROVIDER, value_name = "key")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) provider: Vec<String>,
    /// Root of the partition tree.
    #[arg(long = ARG_STAGE_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// JSON Schema replacing the bundled staging schema.
    #[arg(long = ARG_STAGE_SCHEMA, value_name = "path")]
    #[serde(default)]
    pub(crate) schema: Option<Utf8PathBuf>,
    /// Map raw provider rows (`gcp` or `wri-unfccc`) before validation.
    #[arg(long = ARG_STAGE_MAPPER, value_name = "provider")]
    #[serde(default)]
    pub(crate) mapper: Option<String>,
}

impl StageArgs {
    pub(crate) fn into_config(self) -> Result<StageConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        StageConfig::try_from(merged)
    }
}

/// Resolved `stage` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) partition_keys: Vec<String>,
    pub(crate) output_dir: Utf8PathBuf,
    pub(crate) schema: Option<Utf8PathBuf>,
    pub(crate) mapper: Option<Provider>,
}

impl StageConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.input, ARG_STAGE_INPUT)?;
        if let Some(schema) = &self.schema {
            require_existing(schema, ARG_STAGE_SCHEMA)?;
        }
        Ok(())
    }

    fn validator(&self) -> Result<SchemaValidator, CliError> {
        let Some(path) = &self.schema else {
            return Ok(SchemaValidator::staging()?);
        };
        let read_error = |source| CliError::ReadSchema {
            path: path.clone(),
            source,
        };
        let mut raw = String::new();
        ogs_fs::open_utf8_file(path)
            .map_err(read_error)?
            .read_to_string(&mut raw)
            .map_err(read_error)?;
        Ok(SchemaValidator::from_json_str(&raw)?)
    }
}

impl TryFrom<StageArgs> for StageConfig {
    type Error = CliError;

    fn try_from(args: StageArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_STAGE_INPUT,
            env: ENV_STAGE_INPUT,
        })?;
        if args.provider.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_STAGE_PROVIDER,
                env: ENV_STAGE_PROVIDER,
            });
        }
        let output_dir = args.output_dir.ok_or(CliError::MissingArgument {
            field: ARG_STAGE_OUTPUT_DIR,
            env: ENV_STAGE_OUTPUT_DIR,
        })?;
        let mapper = args
            .mapper
            .as_deref()
            .map(str::parse::<Provider>)
            .transpose()?;
        Ok(Self {
            input,
            partition_keys: args.provider,
            output_dir,
            schema: args.schema,
            mapper,
        })
    }
}

/// Counts printed once a partition has been staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StageSummary {
    pub(crate) partition: String,
    pub(crate) path: Utf8PathBuf,
    pub(crate) staged: usize,
    pub(crate) rejected: usize,
    pub(crate) unmapped: usize,
}

pub(crate) fn run_stage_with(args: StageArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summary = execute_stage(&config)?;
    write_json(writer, &summary)
}

pub(crate) fn execute_stage(config: &StageConfig) -> Result<StageSummary, CliError> {
    let router = PartitionRouter::new(&config.partition_keys)?;
    let validator = config.validator()?;
    let mut candidates = read_values(&config.input)?;
    let mut unmapped = 0;
    if let Some(provider) = config.mapper {
        let (mapped, not_mapped) = map_candidates(provider, candidates);
        candidates = mapped;
        unmapped = not_mapped;
    }

    let staged = stage(candidates, &validator, &router);
    let path = staged.write(&config.output_dir)?;
    Ok(StageSummary {
        partition: staged.key,
        path,
        staged: staged.records.len(),
        rejected: staged.rejected.len(),
        unmapped,
    })
}

/// Map raw rows into record candidates, returning them with the number of
/// rows that were skipped or failed to map.
fn map_candidates(provider: Provider, rows: Vec<Value>) -> (Vec<Value>, usize) {
    let mut objects: Vec<Row> = Vec::with_capacity(rows.len());
    let mut not_objects = 0;
    for (index, row) in rows.into_iter().enumerate() {
        match row {
            Value::Object(map) => objects.push(map),
            other => {
                warn!("row {index} is not an object: {other}");
                not_objects += 1;
            }
        }
    }

    let mapper = provider.mapper();
    let mapped = map_rows(&*mapper, &objects);
    let unmapped = not_objects + mapped.skipped + mapped.failed.len();
    let candidates = mapped
        .records
        .into_iter()
        .filter_map(|record| match serde_json::to_value(&record) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("failed to re-encode mapped record: {err}");
                None
            }
        })
        .collect();
    (candidates, unmapped)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<StageConfig, CliError> {
    let merged = StageArgs::merge_from_layers(layers).map_err(CliError::from)?;
    StageConfig::try_from(merged)
}
