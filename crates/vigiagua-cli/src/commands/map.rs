use clap::Args;
use serde_json::{json, Value};

use vigiagua_core::aggregate::{aggregate_year, HierarchyLevel};
use vigiagua_core::dashboard::resolve_year;
use vigiagua_core::geo_join::{join_boundaries, to_feature_collection};

use super::SourceArgs;

/// Arguments for the choropleth GeoJSON export
#[derive(Args)]
pub struct MapArgs {
    /// Reference year (defaults to the latest year in the dataset)
    #[arg(long)]
    pub year: Option<i32>,

    /// Write the FeatureCollection to this file instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

pub fn run_map(args: MapArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = source.load()?;
    let year = resolve_year(&ctx, args.year)?;

    let rows = aggregate_year(&ctx.records, year, HierarchyLevel::Municipality);
    let joined = join_boundaries(&ctx.boundaries, &rows);
    let matched = joined.iter().filter(|r| r.is_matched()).count();
    let collection = geojson::GeoJson::from(to_feature_collection(&joined));

    match args.out {
        Some(path) => {
            std::fs::write(&path, collection.to_string())
                .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            tracing::info!(path = %path, features = joined.len(), "map written");
            Ok(json!({
                "written": path,
                "year": year,
                "features": joined.len(),
                "matched": matched,
                "unmatched": joined.len() - matched,
            }))
        }
        None => Ok(serde_json::to_value(&collection)?),
    }
}
