use serde::{Deserialize, Serialize};

use crate::error::VigiaguaError;
use crate::VigiaguaResult;

/// Header names of the supply-record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSchema {
    pub supply_type: String,
    pub crs: String,
    pub health_region: String,
    pub macro_region: String,
    pub municipality_code: String,
    pub municipality: String,
    pub year: String,
    pub disinfection: String,
    pub population: String,
    /// Optional column; records get `health_area = None` when it is absent
    pub health_area: Option<String>,
    /// Label of the treated disinfection status
    pub treated_label: String,
    /// Label of the untreated disinfection status
    pub not_treated_label: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            supply_type: "Tipo da Forma de Abastecimento".to_string(),
            crs: "Regional de Saúde".to_string(),
            health_region: "Região_saude".to_string(),
            macro_region: "Macro".to_string(),
            municipality_code: "Código IBGE".to_string(),
            municipality: "Município".to_string(),
            year: "Ano de referência".to_string(),
            disinfection: "Desinfecção".to_string(),
            population: "População estimada".to_string(),
            health_area: Some("Área de saúde".to_string()),
            treated_label: "Sim".to_string(),
            not_treated_label: "Não".to_string(),
        }
    }
}

/// Property names of the boundary GeoJSON features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundarySchema {
    pub code: String,
    pub name: String,
}

impl Default for BoundarySchema {
    fn default() -> Self {
        Self {
            code: "CD_MUN".to_string(),
            name: "NM_MUN".to_string(),
        }
    }
}

/// Where the two datasets come from and how to read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Supply-record file: path, `.zip` path or (with `remote`) URL
    pub records: String,
    /// Boundary GeoJSON: path or (with `remote`) URL
    pub boundaries: String,
    /// Only records of this supply-type category are kept
    pub supply_type: String,
    /// Field delimiter of the supply-record file
    pub delimiter: char,
    /// Seconds a loaded dataset stays valid; `None` keeps it for the process lifetime
    pub ttl_secs: Option<u64>,
    pub record_schema: RecordSchema,
    pub boundary_schema: BoundarySchema,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            records: "data/dados_tratamento_sac.zip".to_string(),
            boundaries: "data/RS_Municipios_2021.json".to_string(),
            supply_type: "SAC".to_string(),
            delimiter: ';',
            ttl_secs: None,
            record_schema: RecordSchema::default(),
            boundary_schema: BoundarySchema::default(),
        }
    }
}

impl SourceConfig {
    /// Reject configurations the loaders cannot work with.
    pub fn validate(&self) -> VigiaguaResult<()> {
        if self.records.trim().is_empty() {
            return Err(VigiaguaError::InvalidInput {
                field: "records".into(),
                reason: "supply-record source must not be empty".into(),
            });
        }
        if self.boundaries.trim().is_empty() {
            return Err(VigiaguaError::InvalidInput {
                field: "boundaries".into(),
                reason: "boundary source must not be empty".into(),
            });
        }
        if !self.delimiter.is_ascii() {
            return Err(VigiaguaError::InvalidInput {
                field: "delimiter".into(),
                reason: format!("'{}' is not a single-byte delimiter", self.delimiter),
            });
        }
        if self.record_schema.treated_label.trim().to_lowercase()
            == self.record_schema.not_treated_label.trim().to_lowercase()
        {
            return Err(VigiaguaError::InvalidInput {
                field: "record_schema".into(),
                reason: "treated and not-treated labels must differ".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SourceConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.supply_type, "SAC");
        assert_eq!(cfg.delimiter, ';');
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: SourceConfig =
            serde_json::from_str(r#"{"records": "a.csv", "ttl_secs": 300}"#).unwrap();
        assert_eq!(cfg.records, "a.csv");
        assert_eq!(cfg.ttl_secs, Some(300));
        assert_eq!(cfg.boundary_schema.code, "CD_MUN");
        assert_eq!(cfg.record_schema.treated_label, "Sim");
    }

    #[test]
    fn test_identical_status_labels_rejected() {
        let mut cfg = SourceConfig::default();
        cfg.record_schema.not_treated_label = " SIM ".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(VigiaguaError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_multibyte_delimiter_rejected() {
        let cfg = SourceConfig {
            delimiter: '§',
            ..SourceConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
