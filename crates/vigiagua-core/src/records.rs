use std::str::FromStr;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{RecordSchema, SourceConfig};
use crate::error::VigiaguaError;
use crate::normalize::{canonical_code, normalize_region_code};
use crate::source::DataSource;
use crate::types::{Population, Year};
use crate::VigiaguaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether the served population's water receives disinfection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DisinfectionStatus {
    Treated,
    NotTreated,
}

/// One row of the supply-record file after filtering and normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub municipality: String,
    /// IBGE municipality code in canonical textual form, e.g. "431490"
    pub municipality_code: String,
    /// Health-region name
    pub health_region: String,
    /// Health-region code, zero-padded to 7 characters
    pub crs: String,
    pub macro_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_area: Option<String>,
    pub supply_type: String,
    pub year: Year,
    pub status: DisinfectionStatus,
    pub population: Population,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and filter the supply-record dataset described by `config`.
pub fn load_records(config: &SourceConfig) -> VigiaguaResult<Vec<SupplyRecord>> {
    let source = DataSource::parse(&config.records)?;
    let text = source.read_text()?;
    parse_records(&text, config).map_err(|e| match e {
        VigiaguaError::MissingColumn { column, .. } => VigiaguaError::MissingColumn {
            origin: source.describe(),
            column,
        },
        other => other,
    })
}

/// Parse delimited supply-record text, keeping only rows of the configured
/// supply type.
///
/// Any malformed kept row aborts the whole load: callers never see a
/// partial dataset.
pub fn parse_records(text: &str, config: &SourceConfig) -> VigiaguaResult<Vec<SupplyRecord>> {
    let start = Instant::now();
    let schema = &config.record_schema;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns = Columns::resolve(rdr.headers()?, schema)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in rdr.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let supply_type = field(columns.supply_type);
        if supply_type != config.supply_type {
            skipped += 1;
            continue;
        }

        let year_text = canonical_code(field(columns.year));
        let year = year_text
            .parse::<Year>()
            .map_err(|_| VigiaguaError::InvalidRecord {
                line,
                reason: format!("reference year '{}' is not an integer", field(columns.year)),
            })?;

        let status = parse_status(field(columns.disinfection), schema).ok_or_else(|| {
            VigiaguaError::InvalidRecord {
                line,
                reason: format!(
                    "disinfection status '{}' is neither '{}' nor '{}'",
                    field(columns.disinfection),
                    schema.treated_label,
                    schema.not_treated_label
                ),
            }
        })?;

        let population = parse_population(field(columns.population))
            .map_err(|reason| VigiaguaError::InvalidRecord { line, reason })?;

        let municipality_code = canonical_code(field(columns.municipality_code));
        if municipality_code.is_empty() {
            return Err(VigiaguaError::InvalidRecord {
                line,
                reason: "empty municipality code".into(),
            });
        }

        records.push(SupplyRecord {
            municipality: field(columns.municipality).to_string(),
            municipality_code,
            health_region: field(columns.health_region).to_string(),
            crs: normalize_region_code(field(columns.crs)),
            macro_region: field(columns.macro_region).to_string(),
            health_area: columns
                .health_area
                .map(|idx| field(idx).to_string())
                .filter(|s| !s.is_empty()),
            supply_type: supply_type.to_string(),
            year,
            status,
            population,
        });
    }

    tracing::info!(
        kept = records.len(),
        skipped,
        supply_type = %config.supply_type,
        elapsed_us = start.elapsed().as_micros() as u64,
        "parsed supply records"
    );
    Ok(records)
}

/// Column indices resolved from the header row.
struct Columns {
    supply_type: usize,
    crs: usize,
    health_region: usize,
    macro_region: usize,
    municipality_code: usize,
    municipality: usize,
    year: usize,
    disinfection: usize,
    population: usize,
    health_area: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, schema: &RecordSchema) -> VigiaguaResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name.trim());
        let require = |name: &str| {
            find(name).ok_or_else(|| VigiaguaError::MissingColumn {
                origin: "supply records".into(),
                column: name.to_string(),
            })
        };
        Ok(Self {
            supply_type: require(&schema.supply_type)?,
            crs: require(&schema.crs)?,
            health_region: require(&schema.health_region)?,
            macro_region: require(&schema.macro_region)?,
            municipality_code: require(&schema.municipality_code)?,
            municipality: require(&schema.municipality)?,
            year: require(&schema.year)?,
            disinfection: require(&schema.disinfection)?,
            population: require(&schema.population)?,
            health_area: schema.health_area.as_deref().and_then(|name| find(name)),
        })
    }
}

fn parse_status(raw: &str, schema: &RecordSchema) -> Option<DisinfectionStatus> {
    let value = raw.trim().to_lowercase();
    if value == schema.treated_label.trim().to_lowercase() {
        Some(DisinfectionStatus::Treated)
    } else if value == schema.not_treated_label.trim().to_lowercase() {
        Some(DisinfectionStatus::NotTreated)
    } else {
        None
    }
}

/// Parse an estimated population. Accepts `.` or `,` as the decimal
/// separator and `1.234,5` style thousands grouping; empty means zero.
pub fn parse_population(raw: &str) -> Result<Population, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let normalized = if raw.contains(',') && raw.contains('.') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.replace(',', ".")
    };
    let value = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|_| format!("estimated population '{raw}' is not a number"))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(format!("estimated population '{raw}' is negative"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const HEADER: &str = "Tipo da Forma de Abastecimento;Regional de Saúde;Região_saude;Macro;Código IBGE;Município;Ano de referência;Desinfecção;População estimada";

    fn records_text(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    #[test]
    fn test_parses_and_normalizes_row() {
        let text = records_text(&["SAC;1;Verdes Campos;Centro-Oeste;431490.0;Santa Maria;2020;Sim;1500"]);
        let records = parse_records(&text, &SourceConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.crs, "0000001");
        assert_eq!(r.municipality_code, "431490");
        assert_eq!(r.municipality, "Santa Maria");
        assert_eq!(r.year, 2020);
        assert_eq!(r.status, DisinfectionStatus::Treated);
        assert_eq!(r.population, dec!(1500));
        assert_eq!(r.health_area, None);
    }

    #[test]
    fn test_filters_other_supply_types() {
        let text = records_text(&[
            "SAA;1;R;M;430001;A;2020;Sim;100",
            "SAC;1;R;M;430001;A;2020;Não;50",
            "SAI;1;R;M;430001;A;2020;Sim;70",
        ]);
        let records = parse_records(&text, &SourceConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DisinfectionStatus::NotTreated);
    }

    #[test]
    fn test_filter_happens_before_validation() {
        // Garbage in a non-SAC row is never inspected
        let text = records_text(&["SAA;1;R;M;430001;A;abc;Talvez;-1", "SAC;1;R;M;430001;A;2020;Sim;1"]);
        assert_eq!(parse_records(&text, &SourceConfig::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let text = "Tipo da Forma de Abastecimento;Município\nSAC;A";
        match parse_records(text, &SourceConfig::default()) {
            Err(VigiaguaError::MissingColumn { column, .. }) => {
                assert_eq!(column, "Regional de Saúde")
            }
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_status_names_line() {
        let text = records_text(&["SAC;1;R;M;430001;A;2020;Sim;1", "SAC;1;R;M;430001;A;2020;Talvez;1"]);
        match parse_records(&text, &SourceConfig::default()) {
            Err(VigiaguaError::InvalidRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid record, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_population_rejected() {
        let text = records_text(&["SAC;1;R;M;430001;A;2020;Sim;-5"]);
        assert!(matches!(
            parse_records(&text, &SourceConfig::default()),
            Err(VigiaguaError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_status_labels_case_insensitive() {
        let text = records_text(&["SAC;1;R;M;430001;A;2020; SIM ;1", "SAC;1;R;M;430001;A;2020;não;2"]);
        let records = parse_records(&text, &SourceConfig::default()).unwrap();
        assert_eq!(records[0].status, DisinfectionStatus::Treated);
        assert_eq!(records[1].status, DisinfectionStatus::NotTreated);
    }

    #[test]
    fn test_optional_health_area_column() {
        let text = format!(
            "{HEADER};Área de saúde\nSAC;1;R;M;430001;A;2020;Sim;1;Metropolitana\nSAC;1;R;M;430001;A;2020;Não;1;"
        );
        let records = parse_records(&text, &SourceConfig::default()).unwrap();
        assert_eq!(records[0].health_area.as_deref(), Some("Metropolitana"));
        assert_eq!(records[1].health_area, None);
    }

    #[test]
    fn test_parse_population_formats() {
        assert_eq!(parse_population("1500").unwrap(), dec!(1500));
        assert_eq!(parse_population("1500,5").unwrap(), dec!(1500.5));
        assert_eq!(parse_population("1.234,5").unwrap(), dec!(1234.5));
        assert_eq!(parse_population("12.75").unwrap(), dec!(12.75));
        assert_eq!(parse_population("").unwrap(), dec!(0));
        assert_eq!(parse_population("1e3").unwrap(), dec!(1000));
        assert!(parse_population("muitos").is_err());
    }
}
