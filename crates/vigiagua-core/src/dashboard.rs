use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_year, summarize, CoverageMetrics, CoverageRow, HierarchyLevel};
use crate::context::DatasetContext;
use crate::error::VigiaguaError;
use crate::geo_join::{join_boundaries, JoinedMapRow};
use crate::normalize::normalize_region_code;
use crate::records::SupplyRecord;
use crate::scope::{group_keys, municipalities_in_crs};
use crate::trend::{build_trends, TrendTable};
use crate::types::{with_metadata, ComputationOutput, Percent, Year};
use crate::VigiaguaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A user selection. Unset fields fall back to the latest year and the
/// first CRS code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub year: Option<Year>,
    #[serde(default)]
    pub crs: Option<String>,
}

/// One line of a summary table: current-year coverage plus history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub key: String,
    pub label: String,
    pub population: u64,
    pub percent_treated: Option<Percent>,
    /// Percent-treated per year of `SummaryTable::years`
    pub history: Vec<Option<Percent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub level: HierarchyLevel,
    pub title: String,
    pub years: Vec<Year>,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub year: Year,
    pub crs: Option<String>,
    /// Selector values
    pub available_years: Vec<Year>,
    pub available_crs: Vec<String>,
    pub metrics: CoverageMetrics,
    /// Macro, health region, CRS, municipality, in that order
    pub tables: Vec<SummaryTable>,
    pub map: Vec<JoinedMapRow>,
}

impl DashboardView {
    pub fn table(&self, level: HierarchyLevel) -> Option<&SummaryTable> {
        self.tables.iter().find(|t| t.level == level)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn combine(rows: Vec<CoverageRow>, trends: &TrendTable) -> Vec<SummaryRow> {
    rows.into_iter()
        .map(|row| {
            let history = trends
                .get(&row.key)
                .map(|s| s.sparkline())
                .unwrap_or_else(|| vec![None; trends.axis.len()]);
            SummaryRow {
                key: row.key,
                label: row.label,
                population: row.population,
                percent_treated: row.percent_treated,
                history,
            }
        })
        .collect()
}

/// Coverage for `year` at `level` with each group's full history attached.
pub fn summary_table(records: &[SupplyRecord], year: Year, level: HierarchyLevel) -> SummaryTable {
    let trends = build_trends(records, level);
    let rows = combine(aggregate_year(records, year, level), &trends);
    SummaryTable {
        level,
        title: level.title().to_string(),
        years: trends.axis.years().to_vec(),
        rows,
    }
}

/// Municipality table for `year` limited to the members of one CRS, ordered
/// by name and then IBGE code.
pub fn crs_municipality_table(records: &[SupplyRecord], year: Year, crs: &str) -> SummaryTable {
    let members = municipalities_in_crs(records, crs);
    let mut table = summary_table(records, year, HierarchyLevel::Municipality);
    table.rows.retain(|r| members.contains(&r.key));
    table
        .rows
        .sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.key.cmp(&b.key)));
    table
}

/// Resolve the selected year against the dataset's year axis.
pub fn resolve_year(ctx: &DatasetContext, requested: Option<Year>) -> VigiaguaResult<Year> {
    match requested {
        Some(year) if ctx.years.contains(year) => Ok(year),
        Some(year) => Err(VigiaguaError::InvalidInput {
            field: "year".into(),
            reason: format!("{year} is not in the dataset (available: {:?})", ctx.years.years()),
        }),
        None => ctx.years.latest().ok_or_else(|| VigiaguaError::InvalidInput {
            field: "year".into(),
            reason: "the dataset has no records".into(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Everything the presentation layer shows for one selection: the map rows,
/// four summary tables and the headline metrics.
pub fn build_dashboard(
    ctx: &DatasetContext,
    selection: &Selection,
) -> VigiaguaResult<ComputationOutput<DashboardView>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let year = resolve_year(ctx, selection.year)?;
    let records = ctx.records.as_slice();

    let available_crs: Vec<String> = group_keys(records, HierarchyLevel::Crs).into_iter().collect();
    let crs = selection
        .crs
        .as_deref()
        .map(|code| normalize_region_code(code))
        .or_else(|| available_crs.first().cloned());

    let mut tables = Vec::with_capacity(HierarchyLevel::ALL.len());
    for level in HierarchyLevel::ALL {
        let table = match (level, crs.as_deref()) {
            (HierarchyLevel::Municipality, Some(code)) => crs_municipality_table(records, year, code),
            (HierarchyLevel::Municipality, None) => {
                let mut table = summary_table(records, year, level);
                table.rows.clear();
                table
            }
            _ => summary_table(records, year, level),
        };
        if level == HierarchyLevel::Municipality && table.rows.is_empty() {
            warnings.push(format!(
                "No municipalities with {year} data in CRS {}",
                crs.as_deref().unwrap_or("(none)")
            ));
        }
        tables.push(table);
    }

    let crs_rows = aggregate_year(records, year, HierarchyLevel::Crs);
    let municipal_rows = aggregate_year(records, year, HierarchyLevel::Municipality);

    let map = join_boundaries(&ctx.boundaries, &municipal_rows);
    let unmatched = map.iter().filter(|r| !r.is_matched()).count();
    if unmatched > 0 {
        warnings.push(format!(
            "{unmatched} of {} boundary polygons have no {year} coverage data",
            map.len()
        ));
    }
    let matched_keys: std::collections::HashSet<&str> =
        map.iter().map(|r| r.join_key.as_str()).collect();
    let orphaned = municipal_rows
        .iter()
        .filter(|r| !matched_keys.contains(r.key.as_str()))
        .count();
    if orphaned > 0 {
        warnings.push(format!(
            "{orphaned} municipalities with {year} coverage data have no boundary polygon"
        ));
    }

    let metrics = summarize(&crs_rows);

    let view = DashboardView {
        year,
        crs: crs.clone(),
        available_years: ctx.years.years().to_vec(),
        available_crs,
        metrics,
        tables,
        map,
    };

    let assumptions = serde_json::json!({
        "selection": selection,
        "resolved_year": year,
        "resolved_crs": crs,
        "percent_rounding": "2 decimal places, half-even",
        "zero_population": "percent_treated is null",
        "missing_year": "history entry is null",
    });

    Ok(with_metadata(
        "SAC treated-water coverage: status pivot per hierarchy level, left join to municipal boundaries",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        view,
    ))
}
