//! Global Carbon Project national fossil CO2 emissions.
//!
//! Rows: `Year`, `country_alpha-3`, `sector` (one of the fossil sectors) and
//! `value` in MtCO2. Values are converted to MtC so they line up with the
//! provider's other carbon budget tables.

use ogs_core::{DataSource, Emission, GeoComponent, Record, Sector, Unit};
use serde_json::Number;

use super::{MappingError, Row, RowMapper, first_of_year, number, required, text};

pub(super) const PROVIDER: &str = "gcp";
const LINK: &str = "https://www.globalcarbonproject.org/carbonbudget/20/data.html";
const GAS: &str = "CO2";
const UNIT: &str = "MtC";
/// Mass ratio of CO2 to C.
const CO2_PER_C: f64 = 3.664;

fn mapped_sector(sector: &str) -> Option<&'static str> {
    Some(match sector {
        "Coal" => "fossil_emissions_coal",
        "Oil" => "fossil_emissions_oil",
        "Gas" => "fossil_emissions_gas",
        "Cement" => "fossil_emissions_cement",
        "Flaring" => "fossil_emissions_flaring",
        "Other" => "fossil_emissions_other",
        _ => return None,
    })
}

fn carbon(row: &Row) -> Result<Number, MappingError> {
    let co2 = number(row, "value")?;
    Number::from_f64(co2 / CO2_PER_C).ok_or_else(|| MappingError::InvalidColumn {
        column: "value",
        expected: "a finite number",
        found: co2.to_string(),
    })
}

/// Mapper for Global Carbon Project rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpMapper;

impl RowMapper for GcpMapper {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    /// Aggregate rows without a country code and empty cells are not
    /// emissions observations.
    fn accepts(&self, row: &Row) -> bool {
        required(row, "country_alpha-3").is_ok() && required(row, "value").is_ok()
    }

    fn map_row(&self, row: &Row) -> Result<Record, MappingError> {
        let sector = text(row, "sector")?;
        let sector_mapped_name = mapped_sector(sector).ok_or_else(|| MappingError::UnknownSector {
            provider: PROVIDER,
            sector: sector.to_owned(),
        })?;

        Ok(Record {
            data_source: DataSource {
                link: Some(LINK.to_owned()),
                ..DataSource::named(PROVIDER)
            },
            geo_component: GeoComponent {
                scale: Some("Country".to_owned()),
                ..GeoComponent::identified_by("alpha3", text(row, "country_alpha-3")?)
            },
            date: first_of_year(row, "Year")?,
            emission: Emission {
                gas: GAS.to_owned(),
                value: carbon(row)?,
                unit: Unit::used(UNIT),
                sector: Sector::new(sector, sector_mapped_name),
            },
        })
    }
}
