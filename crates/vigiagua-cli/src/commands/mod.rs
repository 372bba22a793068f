pub mod catalog;
pub mod coverage;
pub mod dashboard;
pub mod map;

use clap::{Args, ValueEnum};

use vigiagua_core::aggregate::HierarchyLevel;
use vigiagua_core::config::SourceConfig;
use vigiagua_core::context::{ContextCache, DatasetContext};

use crate::input;

/// Dataset location flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Path to a YAML or JSON source configuration
    #[arg(long, global = true, env = "VIGIAGUA_CONFIG")]
    pub config: Option<String>,

    /// Supply-record file (.csv, .zip or URL)
    #[arg(long, global = true, env = "VIGIAGUA_RECORDS")]
    pub records: Option<String>,

    /// Municipal boundary GeoJSON (path or URL)
    #[arg(long, global = true, env = "VIGIAGUA_BOUNDARIES")]
    pub boundaries: Option<String>,

    /// Supply-type category to keep
    #[arg(long, global = true)]
    pub supply_type: Option<String>,

    /// Field delimiter of the supply-record file
    #[arg(long, global = true)]
    pub delimiter: Option<char>,
}

impl SourceArgs {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve(&self) -> Result<SourceConfig, Box<dyn std::error::Error>> {
        let mut config: SourceConfig = match self.config {
            Some(ref path) => input::file::read_config(path)?,
            None => SourceConfig::default(),
        };
        if let Some(ref records) = self.records {
            config.records = records.clone();
        }
        if let Some(ref boundaries) = self.boundaries {
            config.boundaries = boundaries.clone();
        }
        if let Some(ref supply_type) = self.supply_type {
            config.supply_type = supply_type.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the dataset context once for this invocation.
    pub fn load(&self) -> Result<std::sync::Arc<DatasetContext>, Box<dyn std::error::Error>> {
        let mut cache = ContextCache::new(self.resolve()?);
        Ok(cache.get()?)
    }
}

/// Hierarchy level selector
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Macro,
    HealthRegion,
    Crs,
    Municipality,
}

impl From<LevelArg> for HierarchyLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Macro => HierarchyLevel::MacroRegion,
            LevelArg::HealthRegion => HierarchyLevel::HealthRegion,
            LevelArg::Crs => HierarchyLevel::Crs,
            LevelArg::Municipality => HierarchyLevel::Municipality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        format!("{}/../vigiagua-core/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn args() -> SourceArgs {
        SourceArgs {
            config: None,
            records: Some(fixture("registros_sac.csv")),
            boundaries: Some(fixture("municipios_rs.geojson")),
            supply_type: None,
            delimiter: None,
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut source = args();
        source.supply_type = Some("SAA".into());
        source.delimiter = Some(',');
        let config = source.resolve().unwrap();
        assert_eq!(config.supply_type, "SAA");
        assert_eq!(config.delimiter, ',');
        assert!(config.records.ends_with("registros_sac.csv"));
    }

    #[test]
    fn test_load_fixture_dataset() {
        let ctx = args().load().unwrap();
        assert_eq!(ctx.years.years(), &[2019, 2020, 2021]);
        assert_eq!(ctx.boundaries.len(), 4);
    }

    #[test]
    fn test_level_arg_maps_to_hierarchy() {
        assert_eq!(HierarchyLevel::from(LevelArg::Macro), HierarchyLevel::MacroRegion);
        assert_eq!(HierarchyLevel::from(LevelArg::Municipality), HierarchyLevel::Municipality);
    }
}
