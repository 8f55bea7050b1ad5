//! Row → building record mapping.
//!
//! Every output field has exactly one source column and one documented
//! fallback. Only the building id and the street-line components are
//! required; everything else degrades to a fixed default.

use crate::clock::Clock;
use crate::complement::Complement;
use crate::error::{GeradorError, Result};
use crate::loader::InputRow;

/// Source column names.
pub mod columns {
    pub const COD_SURVEY: &str = "COD_SURVEY";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const COD_ZONA: &str = "COD_ZONA";
    pub const LOCALIDADE: &str = "LOCALIDADE";
    pub const ID_ENDERECO: &str = "ID_ENDERECO";
    pub const LOGRADOURO: &str = "LOGRADOURO";
    pub const BAIRRO: &str = "BAIRRO";
    pub const MUNICIPIO: &str = "MUNICIPIO";
    pub const UF: &str = "UF";
    pub const COD_LOGRADOURO: &str = "COD_LOGRADOURO";
    pub const NUM_FACHADA: &str = "NUM_FACHADA";
    pub const COMPLEMENTO: &str = "COMPLEMENTO";
    pub const COMPLEMENTO2: &str = "COMPLEMENTO2";
    pub const RESULTADO: &str = "RESULTADO";
    pub const CEP: &str = "CEP";
    pub const ID_ROTEIRO: &str = "ID_ROTEIRO";
    pub const ID_LOCALIDADE: &str = "ID_LOCALIDADE";
    pub const QUANTIDADE_UMS: &str = "QUANTIDADE_UMS";
    pub const ESTACAO_ABASTECEDORA: &str = "ESTACAO_ABASTECEDORA";
}

/// Values used when a column is missing, plus the fixed identifiers.
pub mod defaults {
    pub const ZONE: &str = "DF-GURX-ETGR-CEOS-68";
    pub const LOCALITY: &str = "GUARA";
    pub const ADDRESS_ID: &str = "93128133";
    pub const FACADE_NUMBER: &str = "SN";
    pub const POSTAL_CODE: &str = "71065071";
    pub const ROUTE_ID: &str = "57149008";
    pub const LOCALITY_ID: &str = "1894644";
    pub const STREET_CODE: &str = "2700035341";
    pub const UNIT_COUNT: i64 = 1;
    pub const TECHNICIAN_ID: &str = "1828772688";
    pub const TECHNICIAN_NAME: &str = "NADIA CAROLINE";
    pub const COMPANY_ID: &str = "42541126";
    pub const COMPANY_NAME: &str = "TELEMONT";
    pub const OCCUPANCY: &str = "EDIFICACAOCOMPLETA";
    pub const FLOOR_COUNT: &str = "1";
}

/// Use of the building.
///
/// Only the `RESULTADO` prefix rule is live. An older rule derived the
/// destination from residential/commercial unit counts (with a `MISTA`
/// outcome); it is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Residencia,
    Comercio,
}

impl Destination {
    /// `CA` (casa) and `AP` (apartamento) results are residential.
    pub fn from_result(result: Option<&str>) -> Self {
        let normalized = result.unwrap_or_default().trim().to_uppercase();
        if normalized.starts_with("CA") || normalized.starts_with("AP") {
            Self::Residencia
        } else {
            Self::Comercio
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Residencia => "RESIDENCIA",
            Self::Comercio => "COMERCIO",
        }
    }
}

/// Fixed id/name pair for the technician and the company blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Party {
    pub id: &'static str,
    pub name: &'static str,
}

pub const TECHNICIAN: Party = Party {
    id: defaults::TECHNICIAN_ID,
    name: defaults::TECHNICIAN_NAME,
};

pub const COMPANY: Party = Party {
    id: defaults::COMPANY_ID,
    name: defaults::COMPANY_NAME,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: String,
    pub street_line: String,
    pub facade_number: String,
    pub complements: [Complement; 3],
    pub postal_code: String,
    pub neighborhood: String,
    pub route_id: String,
    pub locality_id: String,
    pub street_code: String,
}

/// One `edificio` document before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingRecord {
    pub building_id: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Written both as zone code and zone name.
    pub zone: String,
    pub locality: String,
    pub address: Address,
    pub technician: Party,
    pub company: Party,
    /// `YYYYMMDDHHMMSS` at build time.
    pub generated_at: String,
    pub unit_count: i64,
    pub occupancy: &'static str,
    pub floor_count: &'static str,
    pub destination: Destination,
}

/// Parse a coordinate written with either decimal separator.
///
/// Returns `None` for missing, non-numeric, or non-finite values.
pub fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    let normalized: String = raw?
        .trim()
        .chars()
        .map(|c| match c {
            ',' => '.',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a unit count; decimal values truncate toward zero.
pub fn parse_unit_count(raw: &str) -> Option<i64> {
    let normalized = raw.trim().replace(',', ".");
    normalized.parse::<i64>().ok().or_else(|| {
        normalized
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

fn require<'a>(row: &'a InputRow, index: usize, column: &'static str) -> Result<&'a str> {
    row.get(column)
        .ok_or(GeradorError::MissingRequiredField { row: index, column })
}

fn compose_street_line(row: &InputRow, index: usize) -> Result<String> {
    Ok(format!(
        "{}, {}, {}, {} - {} ({})",
        require(row, index, columns::LOGRADOURO)?,
        require(row, index, columns::BAIRRO)?,
        require(row, index, columns::MUNICIPIO)?,
        require(row, index, columns::LOCALIDADE)?,
        require(row, index, columns::UF)?,
        require(row, index, columns::COD_LOGRADOURO)?,
    ))
}

/// Map one row (1-based `index`) to a building record.
pub fn map_row(row: &InputRow, index: usize, clock: &dyn Clock) -> Result<BuildingRecord> {
    let building_id = require(row, index, columns::COD_SURVEY)?.to_string();
    let street_line = compose_street_line(row, index)?;

    let locality = row.get_or(columns::LOCALIDADE, defaults::LOCALITY).to_string();
    let neighborhood = row.get_or(columns::BAIRRO, &locality).to_string();

    let unit_count = match row.get(columns::QUANTIDADE_UMS) {
        None => defaults::UNIT_COUNT,
        Some(raw) => parse_unit_count(raw).ok_or_else(|| GeradorError::InvalidField {
            row: index,
            column: columns::QUANTIDADE_UMS,
            value: raw.to_string(),
        })?,
    };

    let address = Address {
        id: row.get_or(columns::ID_ENDERECO, defaults::ADDRESS_ID).to_string(),
        street_line,
        facade_number: row
            .get_or(columns::NUM_FACHADA, defaults::FACADE_NUMBER)
            .to_string(),
        complements: [
            Complement::resolve(row.get(columns::COMPLEMENTO)),
            Complement::resolve(row.get(columns::COMPLEMENTO2)),
            Complement::resolve(row.get(columns::RESULTADO)),
        ],
        postal_code: row.get_or(columns::CEP, defaults::POSTAL_CODE).to_string(),
        neighborhood,
        route_id: row.get_or(columns::ID_ROTEIRO, defaults::ROUTE_ID).to_string(),
        locality_id: row
            .get_or(columns::ID_LOCALIDADE, defaults::LOCALITY_ID)
            .to_string(),
        street_code: row
            .get_or(columns::COD_LOGRADOURO, defaults::STREET_CODE)
            .to_string(),
    };

    Ok(BuildingRecord {
        building_id,
        longitude: parse_coordinate(row.get(columns::LONGITUDE)),
        latitude: parse_coordinate(row.get(columns::LATITUDE)),
        zone: row.get_or(columns::COD_ZONA, defaults::ZONE).to_string(),
        locality,
        address,
        technician: TECHNICIAN,
        company: COMPANY,
        generated_at: clock.timestamp(),
        unit_count,
        occupancy: defaults::OCCUPANCY,
        floor_count: defaults::FLOOR_COUNT,
        destination: Destination::from_result(row.get(columns::RESULTADO)),
    })
}
