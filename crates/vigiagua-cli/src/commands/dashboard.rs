use clap::Args;
use serde_json::Value;

use vigiagua_core::dashboard::{self, Selection};

use super::SourceArgs;
use crate::input;

/// Arguments for the full dashboard view
#[derive(Args)]
pub struct DashboardArgs {
    /// Reference year (defaults to the latest year in the dataset)
    #[arg(long)]
    pub year: Option<i32>,

    /// CRS code scoping the municipality table (any width, e.g. 1 or 0000001)
    #[arg(long)]
    pub crs: Option<String>,

    /// Path to JSON selection file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Leave map geometries out of the output
    #[arg(long)]
    pub no_map: bool,
}

pub fn run_dashboard(args: DashboardArgs, source: &SourceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let selection: Selection = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        Selection {
            year: args.year,
            crs: args.crs,
        }
    };

    let ctx = source.load()?;
    let mut result = dashboard::build_dashboard(&ctx, &selection)?;
    if args.no_map {
        result.result.map.clear();
    }
    Ok(serde_json::to_value(result)?)
}
