//! Command-line interface for staging and loading emission datasets.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use clap::{Parser, Subcommand};

mod error;
mod load;
mod stage;

pub use error::CliError;

use load::LoadArgs;
use stage::StageArgs;

pub(crate) const ARG_STAGE_INPUT: &str = "input";
pub(crate) const ARG_STAGE_PROVIDER: &str = "provider";
pub(crate) const ARG_STAGE_OUTPUT_DIR: &str = "output-dir";
pub(crate) const ARG_STAGE_SCHEMA: &str = "schema";
pub(crate) const ARG_STAGE_MAPPER: &str = "mapper";
pub(crate) const ENV_STAGE_INPUT: &str = "OGS_CMDS_STAGE_INPUT";
pub(crate) const ENV_STAGE_PROVIDER: &str = "OGS_CMDS_STAGE_PROVIDER";
pub(crate) const ENV_STAGE_OUTPUT_DIR: &str = "OGS_CMDS_STAGE_OUTPUT_DIR";

pub(crate) const ARG_LOAD_PARTITIONS_DIR: &str = "partitions-dir";
pub(crate) const ARG_LOAD_SOURCE: &str = "source";
pub(crate) const ARG_LOAD_DATABASE: &str = "database";
pub(crate) const ARG_LOAD_ENDPOINT: &str = "endpoint";
pub(crate) const ARG_LOAD_USER: &str = "user";
pub(crate) const ARG_LOAD_PASSWORD: &str = "password";
pub(crate) const ARG_LOAD_STORE_OPTION: &str = "store-option";
pub(crate) const ARG_LOAD_GEO_COMPONENTS: &str = "geo-components-collection";
pub(crate) const ARG_LOAD_DATA_SOURCES: &str = "data-sources-collection";
pub(crate) const ARG_LOAD_EMISSIONS: &str = "emissions-collection";
pub(crate) const ARG_LOAD_DUPLICATE_POLICY: &str = "duplicate-policy";
pub(crate) const ENV_LOAD_PARTITIONS_DIR: &str = "OGS_CMDS_LOAD_PARTITIONS_DIR";
pub(crate) const ENV_LOAD_SOURCE: &str = "OGS_CMDS_LOAD_SOURCE";
pub(crate) const ENV_LOAD_DATABASE: &str = "OGS_CMDS_LOAD_DATABASE";
pub(crate) const ENV_LOAD_ENDPOINT: &str = "OGS_CMDS_LOAD_ENDPOINT";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments or configuration are invalid, when a
/// dataset cannot be read or written, or when any partition failed to load.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Stage(args) => stage::run_stage_with(args, &mut stdout),
        Command::Load(args) => load::run_load_with(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ogs",
    about = "Stage and load greenhouse-gas emission datasets",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate mapped records and write them as one partition.
    Stage(StageArgs),
    /// Resolve staged partitions and insert them into the document store.
    Load(LoadArgs),
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match ogs_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_json<T: serde::Serialize>(
    writer: &mut dyn std::io::Write,
    payload: &T,
) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(payload).map_err(CliError::SerialiseReport)?;
    writer
        .write_all(rendered.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
