//! Climate Watch (WRI) compilation of UNFCCC greenhouse-gas inventories.
//!
//! Rows: `country`, `source` (the inventory, e.g. `UNFCCC_AI`), `sector`,
//! `gas`, `year` and `value` in Mt CO2 equivalent. The inventory name is kept
//! as the data source's `scenario` property.

use ogs_core::{DataSource, Emission, GeoComponent, Record, Sector, Unit};
use serde_json::{Map, Value};

use super::{MappingError, Row, RowMapper, first_of_year, quantity, required, text};

pub(super) const PROVIDER: &str = "wri-unfccc";
const LINK: &str = "https://www.climatewatchdata.org/";
const UNIT: &str = "Mt co2eq";
/// Annex I aggregate published alongside the national rows.
const ANNEX_I_AGGREGATE: &str = "ANNEXI";

fn mapped_sector(sector: &str) -> Option<&'static str> {
    Some(match sector {
        "Waste" => "waste",
        "Agriculture" => "agriculture",
        "Energy" => "total_energy",
        "Other" => "other",
        "Industrial Processes"
        | "Solvent and Other Product Use"
        | "Industrial Processes and Product Use" => "industrial_processes",
        "Land-Use Change and Forestry" | "Land Use, Land-Use Change and Forestry" => "lucf",
        "Total GHG emissions including LULUCF/LUCF" | "Total GHG emissions with LULUCF" => {
            "total_including_lucf"
        }
        "Total GHG emissions excluding LULUCF/LUCF" | "Total GHG emissions without LULUCF" => {
            "total_excluding_lucf"
        }
        _ => return None,
    })
}

fn mapped_gas(gas: &str) -> Option<&'static str> {
    Some(match gas {
        "Aggregate GHGs" => "kyotogases",
        "Aggregate F-gases" => "F-gas",
        "CH4" => "CH4",
        "CO2" => "CO2",
        "N2O" => "N2O",
        _ => return None,
    })
}

/// Mapper for Climate Watch UNFCCC rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriUnfcccMapper;

impl RowMapper for WriUnfcccMapper {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn accepts(&self, row: &Row) -> bool {
        required(row, "value").is_ok()
            && row.get("country").and_then(Value::as_str) != Some(ANNEX_I_AGGREGATE)
    }

    fn map_row(&self, row: &Row) -> Result<Record, MappingError> {
        let sector = text(row, "sector")?;
        let sector_mapped_name = mapped_sector(sector).ok_or_else(|| MappingError::UnknownSector {
            provider: PROVIDER,
            sector: sector.to_owned(),
        })?;
        let gas = text(row, "gas")?;
        let gas = mapped_gas(gas).ok_or_else(|| MappingError::UnknownGas {
            provider: PROVIDER,
            gas: gas.to_owned(),
        })?;
        let scenario = text(row, "source")?;

        Ok(Record {
            data_source: DataSource {
                link: Some(LINK.to_owned()),
                properties: Some(Map::from_iter([(
                    "scenario".to_owned(),
                    Value::from(scenario),
                )])),
                ..DataSource::named(PROVIDER)
            },
            geo_component: GeoComponent {
                scale: Some("Country".to_owned()),
                ..GeoComponent::identified_by("alpha3", text(row, "country")?)
            },
            date: first_of_year(row, "year")?,
            emission: Emission {
                gas: gas.to_owned(),
                value: quantity(row, "value")?,
                unit: Unit::used(UNIT),
                sector: Sector::new(sector, sector_mapped_name),
            },
        })
    }
}
