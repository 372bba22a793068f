use clap::Args;
use serde_json::{json, Value};

use vigiagua_core::aggregate::HierarchyLevel;
use vigiagua_core::scope::{group_keys, members_of};

use super::{LevelArg, SourceArgs};

/// Arguments for listing reference years
#[derive(Args)]
pub struct YearsArgs {}

/// Arguments for listing regions
#[derive(Args)]
pub struct RegionsArgs {
    /// Hierarchy level to list
    #[arg(long, value_enum, default_value = "crs")]
    pub level: LevelArg,
}

pub fn run_years(_args: YearsArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = source.load()?;
    Ok(json!({
        "years": ctx.years.years(),
        "latest": ctx.years.latest(),
    }))
}

pub fn run_regions(args: RegionsArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let level: HierarchyLevel = args.level.into();
    let ctx = source.load()?;

    let regions: Vec<Value> = group_keys(&ctx.records, level)
        .into_iter()
        .map(|key| {
            let municipalities = members_of(&ctx.records, level, &key).len();
            json!({ "key": key, "municipalities": municipalities })
        })
        .collect();
    Ok(Value::Array(regions))
}
