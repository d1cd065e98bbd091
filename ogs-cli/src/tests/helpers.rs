//! Test helpers for building staging inputs and seeded SQLite stores.

use camino::{Utf8Path, Utf8PathBuf};
use ogs_core::{ConnectionConfig, StoreConnector};
use ogs_data::store::{SQLITE_SCHEME, SqliteConnector};
use serde_json::{Value, json};
use std::io::Write;
use tempfile::TempDir;

pub(super) const DATABASE: &str = "ghg";

#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn staging(&self) -> Utf8PathBuf {
        self.root.join("staging")
    }

    pub(super) fn database_dir(&self) -> Utf8PathBuf {
        self.root.join("db")
    }

    pub(super) fn connection(&self) -> ConnectionConfig {
        ConnectionConfig::new(SQLITE_SCHEME, DATABASE)
            .with_endpoints([self.database_dir().as_str()])
    }

    /// Create the database with France and the given data sources.
    pub(super) fn seed_store(&self, sources: &[&str]) {
        ogs_fs::ensure_parent_dir(&self.database_dir().join("placeholder"))
            .expect("create database dir");
        let mut store = SqliteConnector
            .connect(&self.connection())
            .expect("open database");
        store
            .insert_geo_component([("alpha3".to_owned(), "FRA".to_owned())].into())
            .expect("seed France");
        for source in sources {
            store.insert_data_source(source).expect("seed data source");
        }
    }

    pub(super) fn emission_count(&self) -> usize {
        SqliteConnector
            .connect(&self.connection())
            .expect("open database")
            .count_emissions()
            .expect("count emissions")
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    let mut file = ogs_fs::create_utf8_file(path).expect("create file");
    file.write_all(contents).expect("write file");
}

pub(super) fn write_values(path: &Utf8Path, values: &[Value]) {
    let rendered = serde_json::to_vec(values).expect("serialise values");
    write_utf8(path, &rendered);
}

/// A record accepted by the bundled staging schema.
pub(super) fn record_json(source: &str, alpha3: &str) -> Value {
    json!({
        "data_source": {"name": source},
        "geo_component": {"scale": "Country", "identifier": {"id": alpha3, "type": "alpha3"}},
        "date": "2019-01-01",
        "emission": {
            "gas": "CO2",
            "value": 10.0,
            "unit": {"unit_used": "MtC"},
            "sector": {
                "sector_origin_name": "Coal",
                "sector_mapped_name": "fossil_emissions_coal"
            }
        }
    })
}

/// A record the bundled staging schema rejects.
pub(super) fn invalid_record_json() -> Value {
    let mut record = record_json("gcp", "FRA");
    record["date"] = json!("2019");
    record
}
