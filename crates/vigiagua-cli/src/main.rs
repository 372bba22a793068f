mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::catalog::{RegionsArgs, YearsArgs};
use commands::coverage::{CoverageArgs, TrendsArgs};
use commands::dashboard::DashboardArgs;
use commands::map::MapArgs;
use commands::SourceArgs;

/// Treated-water coverage of populations served by SAC systems
#[derive(Parser)]
#[command(
    name = "vigiagua",
    version,
    about = "Treated-water coverage of populations served by SAC systems",
    long_about = "Aggregates SAC supply records by year, macro-region, health region, \
                  CRS and municipality, attaches historical trends and joins the \
                  municipal coverage onto boundary polygons for choropleth maps."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    source: SourceArgs,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full dashboard view: metrics, four summary tables and map rows
    Dashboard(DashboardArgs),
    /// Coverage table for one hierarchy level and year
    Coverage(CoverageArgs),
    /// Historical percent-treated series for one hierarchy level
    Trends(TrendsArgs),
    /// Export municipal coverage joined onto boundaries as GeoJSON
    Map(MapArgs),
    /// List the reference years present in the dataset
    Years(YearsArgs),
    /// List selectable regions of a hierarchy level
    Regions(RegionsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dashboard(args) => commands::dashboard::run_dashboard(args, &cli.source),
        Commands::Coverage(args) => commands::coverage::run_coverage(args, &cli.source),
        Commands::Trends(args) => commands::coverage::run_trends(args, &cli.source),
        Commands::Map(args) => commands::map::run_map(args, &cli.source),
        Commands::Years(args) => commands::catalog::run_years(args, &cli.source),
        Commands::Regions(args) => commands::catalog::run_regions(args, &cli.source),
        Commands::Version => {
            println!("vigiagua {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
