use std::time::Instant;

use clap::Args;
use serde_json::{json, Value};

use vigiagua_core::aggregate::HierarchyLevel;
use vigiagua_core::dashboard::{crs_municipality_table, resolve_year, summary_table};
use vigiagua_core::scope::{municipalities_in_crs, restrict_series};
use vigiagua_core::trend::build_trends;
use vigiagua_core::types::with_metadata;

use super::{LevelArg, SourceArgs};

/// Arguments for a single coverage table
#[derive(Args)]
pub struct CoverageArgs {
    /// Hierarchy level to group by
    #[arg(long, value_enum, default_value = "crs")]
    pub level: LevelArg,

    /// Reference year (defaults to the latest year in the dataset)
    #[arg(long)]
    pub year: Option<i32>,

    /// Restrict a municipality table to the members of this CRS
    #[arg(long)]
    pub crs: Option<String>,
}

/// Arguments for historical trends
#[derive(Args)]
pub struct TrendsArgs {
    /// Hierarchy level to group by
    #[arg(long, value_enum, default_value = "crs")]
    pub level: LevelArg,

    /// Restrict municipality series to the members of this CRS
    #[arg(long)]
    pub crs: Option<String>,
}

pub fn run_coverage(args: CoverageArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let level: HierarchyLevel = args.level.into();
    let ctx = source.load()?;
    let year = resolve_year(&ctx, args.year)?;

    let mut warnings = Vec::new();
    let table = match (args.crs.as_deref(), level) {
        (Some(crs), HierarchyLevel::Municipality) => crs_municipality_table(&ctx.records, year, crs),
        (Some(_), _) => {
            warnings.push(format!("--crs only scopes the municipality level; ignored for {:?}", level));
            summary_table(&ctx.records, year, level)
        }
        (None, _) => summary_table(&ctx.records, year, level),
    };

    let output = with_metadata(
        "Status pivot of estimated SAC population for one year",
        &json!({ "level": level, "year": year, "crs": args.crs }),
        warnings,
        start.elapsed().as_micros() as u64,
        table,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_trends(args: TrendsArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let level: HierarchyLevel = args.level.into();
    let ctx = source.load()?;

    let mut trends = build_trends(&ctx.records, level);
    if let (Some(crs), HierarchyLevel::Municipality) = (args.crs.as_deref(), level) {
        let members = municipalities_in_crs(&ctx.records, crs);
        trends.series = restrict_series(trends.series, &members);
    }

    let output = with_metadata(
        "Percent-treated per group and year, aligned on the dataset year axis",
        &json!({ "level": level, "crs": args.crs }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        trends,
    );
    Ok(serde_json::to_value(output)?)
}
