//! Load command: filter staged partitions and insert them into the store.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ogs_core::{CollectionNames, ConnectionConfig, Credentials};
use ogs_data::{
    BatchLoader, DuplicateSourcePolicy, LoadReport, PartitionFilter, PartitionedDataset,
    PartitionedLoadOrchestrator,
    store::{SQLITE_SCHEME, SqliteConnector},
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_LOAD_DATA_SOURCES, ARG_LOAD_DATABASE, ARG_LOAD_DUPLICATE_POLICY, ARG_LOAD_EMISSIONS,
    ARG_LOAD_ENDPOINT, ARG_LOAD_GEO_COMPONENTS, ARG_LOAD_PARTITIONS_DIR, ARG_LOAD_PASSWORD,
    ARG_LOAD_SOURCE, ARG_LOAD_STORE_OPTION, ARG_LOAD_USER, CliError, ENV_LOAD_DATABASE,
    ENV_LOAD_ENDPOINT, ENV_LOAD_PARTITIONS_DIR, ENV_LOAD_SOURCE, write_json,
};

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Discover staged partitions, keep those of the required \
                 sources, resolve their references and bulk insert each \
                 partition into the SQLite document store. The first \
                 endpoint names the directory holding <database>.db. \
                 Options can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Load staged partitions into the document store"
)]
#[ortho_config(prefix = "OGS")]
pub(crate) struct LoadArgs {
    /// Root of the staged partition tree.
    #[arg(long = ARG_LOAD_PARTITIONS_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) partitions_dir: Option<Utf8PathBuf>,
    /// Data source to load; repeat for several.
    #[arg(long = ARG_LOAD_SOURCE, value_name = "id")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) source: Vec<String>,
    /// Database holding the collections.
    #[arg(long = ARG_LOAD_DATABASE, value_name = "name")]
    #[serde(default)]
    pub(crate) database: Option<String>,
    /// Store endpoint; repeat for a cluster.
    #[arg(long = ARG_LOAD_ENDPOINT, value_name = "host")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) endpoint: Vec<String>,
    /// Account used to authenticate.
    #[arg(long = ARG_LOAD_USER, value_name = "user")]
    #[serde(default)]
    pub(crate) user: Option<String>,
    /// Password for `--user`.
    #[arg(long = ARG_LOAD_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Extra connection parameter written as `key=value`.
    #[arg(long = ARG_LOAD_STORE_OPTION, value_name = "key=value")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) store_option: Vec<String>,
    /// Collection of geographic reference entities.
    #[arg(long = ARG_LOAD_GEO_COMPONENTS, value_name = "name")]
    #[serde(default)]
    pub(crate) geo_components_collection: Option<String>,
    /// Collection of data-source reference entities.
    #[arg(long = ARG_LOAD_DATA_SOURCES, value_name = "name")]
    #[serde(default)]
    pub(crate) data_sources_collection: Option<String>,
    /// Destination collection for emission documents.
    #[arg(long = ARG_LOAD_EMISSIONS, value_name = "name")]
    #[serde(default)]
    pub(crate) emissions_collection: Option<String>,
    /// What to do when a source owns several partitions.
    #[arg(long = ARG_LOAD_DUPLICATE_POLICY, value_name = "accept|warn|first-only")]
    #[serde(default)]
    pub(crate) duplicate_policy: Option<String>,
}

impl LoadArgs {
    pub(crate) fn into_config(self) -> Result<LoadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadConfig::try_from(merged)
    }
}

/// Resolved `load` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadConfig {
    pub(crate) partitions_dir: Utf8PathBuf,
    pub(crate) sources: Vec<String>,
    pub(crate) connection: ConnectionConfig,
    pub(crate) duplicate_policy: DuplicateSourcePolicy,
}

impl TryFrom<LoadArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadArgs) -> Result<Self, Self::Error> {
        let partitions_dir = args.partitions_dir.ok_or(CliError::MissingArgument {
            field: ARG_LOAD_PARTITIONS_DIR,
            env: ENV_LOAD_PARTITIONS_DIR,
        })?;
        if args.source.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_LOAD_SOURCE,
                env: ENV_LOAD_SOURCE,
            });
        }
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_LOAD_DATABASE,
            env: ENV_LOAD_DATABASE,
        })?;
        if args.endpoint.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_LOAD_ENDPOINT,
                env: ENV_LOAD_ENDPOINT,
            });
        }

        let defaults = CollectionNames::default();
        let collections = CollectionNames {
            geo_components: args
                .geo_components_collection
                .unwrap_or(defaults.geo_components),
            data_sources: args.data_sources_collection.unwrap_or(defaults.data_sources),
            emissions: args.emissions_collection.unwrap_or(defaults.emissions),
        };
        let mut connection = ConnectionConfig::new(SQLITE_SCHEME, database)
            .with_collections(collections)
            .with_endpoints(args.endpoint);
        if let Some(credentials) = Credentials::from_parts(args.user, args.password) {
            connection = connection.with_credentials(credentials);
        }
        for option in args.store_option {
            let Some((key, value)) = option.split_once('=') else {
                return Err(CliError::InvalidStoreOption { option });
            };
            if key.is_empty() {
                return Err(CliError::InvalidStoreOption { option });
            }
            connection = connection.with_option(key, value);
        }

        let duplicate_policy = args
            .duplicate_policy
            .as_deref()
            .map(str::parse::<DuplicateSourcePolicy>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            partitions_dir,
            sources: args.source,
            connection,
            duplicate_policy,
        })
    }
}

pub(crate) fn run_load_with(args: LoadArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_load(&config)?;
    write_json(writer, &report)?;
    if report.has_failures() {
        return Err(CliError::PartitionsFailed {
            failed: report.failed_partitions().len(),
            total: report.partitions.len(),
        });
    }
    Ok(())
}

pub(crate) fn execute_load(config: &LoadConfig) -> Result<LoadReport, CliError> {
    let partitions = PartitionedDataset::discover(&config.partitions_dir)?.into_partitions();
    let filtered =
        PartitionFilter::new(config.duplicate_policy).filter(partitions, &config.sources);
    let loader = BatchLoader::new(SqliteConnector, config.connection.clone());
    Ok(PartitionedLoadOrchestrator::new(loader).load(filtered))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LoadConfig, CliError> {
    let merged = LoadArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LoadConfig::try_from(merged)
}
