use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::records::{DisinfectionStatus, SupplyRecord};
use crate::types::{Percent, Population, Year};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Administrative level a coverage table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Municipality,
    HealthRegion,
    MacroRegion,
    Crs,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 4] = [
        HierarchyLevel::MacroRegion,
        HierarchyLevel::HealthRegion,
        HierarchyLevel::Crs,
        HierarchyLevel::Municipality,
    ];

    /// Group key of `record` at this level.
    ///
    /// Municipalities are keyed by IBGE code so that homonyms stay apart and
    /// the map join has something stable to match on.
    pub fn key_of<'a>(&self, record: &'a SupplyRecord) -> &'a str {
        match self {
            HierarchyLevel::Municipality => &record.municipality_code,
            HierarchyLevel::HealthRegion => &record.health_region,
            HierarchyLevel::MacroRegion => &record.macro_region,
            HierarchyLevel::Crs => &record.crs,
        }
    }

    /// Human-readable label of `record`'s group at this level.
    pub fn label_of<'a>(&self, record: &'a SupplyRecord) -> &'a str {
        match self {
            HierarchyLevel::Municipality => &record.municipality,
            other => other.key_of(record),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            HierarchyLevel::Municipality => "Município",
            HierarchyLevel::HealthRegion => "Região de Saúde",
            HierarchyLevel::MacroRegion => "Macro",
            HierarchyLevel::Crs => "CRS",
        }
    }
}

/// Treated / not-treated population pivot for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub treated: Population,
    pub not_treated: Population,
}

impl StatusTotals {
    pub fn add(&mut self, status: DisinfectionStatus, population: Population) {
        match status {
            DisinfectionStatus::Treated => self.treated += population,
            DisinfectionStatus::NotTreated => self.not_treated += population,
        }
    }

    pub fn total(&self) -> Population {
        self.treated + self.not_treated
    }

    pub fn percent_treated(&self) -> Option<Percent> {
        coverage_percent(self.treated, self.total())
    }
}

/// Coverage of one group for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub key: String,
    pub label: String,
    pub treated: Population,
    pub not_treated: Population,
    /// treated + not_treated
    pub total: Population,
    /// `total` rounded to whole people
    pub population: u64,
    /// treated / total * 100, two decimals; `None` when total is zero
    pub percent_treated: Option<Percent>,
}

impl CoverageRow {
    fn new(key: String, label: String, totals: StatusTotals) -> Self {
        let total = totals.total();
        Self {
            key,
            label,
            treated: totals.treated,
            not_treated: totals.not_treated,
            total,
            population: whole_population(total),
            percent_treated: totals.percent_treated(),
        }
    }
}

/// Scalar metrics over a set of coverage rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub percent_treated: Option<Percent>,
    pub population: u64,
    pub groups: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Percentage of `treated` in `total`, rounded to two decimals (banker's
/// rounding). `None` when `total` is zero.
pub fn coverage_percent(treated: Population, total: Population) -> Option<Percent> {
    if total.is_zero() {
        return None;
    }
    Some((treated / total * dec!(100)).round_dp(2))
}

fn whole_population(total: Population) -> u64 {
    total.round().to_u64().unwrap_or(0)
}

/// Sum population by (group key, status) over an iterator of records.
/// The label of a group is taken from its first record.
fn pivot<'a>(
    records: impl Iterator<Item = &'a SupplyRecord>,
    level: HierarchyLevel,
) -> BTreeMap<String, (String, StatusTotals)> {
    let mut groups: BTreeMap<String, (String, StatusTotals)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(level.key_of(record).to_string())
            .or_insert_with(|| (level.label_of(record).to_string(), StatusTotals::default()));
        entry.1.add(record.status, record.population);
    }
    groups
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Coverage table for `year` at `level`, one row per group present in that
/// year, ordered by key. Groups without records in `year` are absent.
pub fn aggregate_year(records: &[SupplyRecord], year: Year, level: HierarchyLevel) -> Vec<CoverageRow> {
    let groups = pivot(records.iter().filter(|r| r.year == year), level);
    let rows: Vec<CoverageRow> = groups
        .into_iter()
        .map(|(key, (label, totals))| CoverageRow::new(key, label, totals))
        .collect();
    tracing::debug!(year, ?level, groups = rows.len(), "aggregated coverage");
    rows
}

/// Aggregate percent-treated and population across `rows`.
pub fn summarize(rows: &[CoverageRow]) -> CoverageMetrics {
    let treated: Decimal = rows.iter().map(|r| r.treated).sum();
    let total: Decimal = rows.iter().map(|r| r.total).sum();
    CoverageMetrics {
        percent_treated: coverage_percent(treated, total),
        population: whole_population(total),
        groups: rows.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(mun: &str, code: &str, crs: &str, year: Year, status: DisinfectionStatus, pop: Decimal) -> SupplyRecord {
        SupplyRecord {
            municipality: mun.to_string(),
            municipality_code: code.to_string(),
            health_region: format!("Região {crs}"),
            crs: crs.to_string(),
            macro_region: "Norte".to_string(),
            health_area: None,
            supply_type: "SAC".to_string(),
            year,
            status,
            population: pop,
        }
    }

    use DisinfectionStatus::{NotTreated, Treated};

    #[test]
    fn test_two_thirds_treated() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(100)),
            rec("MunA", "430001", "0000001", 2020, NotTreated, dec!(50)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "430001");
        assert_eq!(rows[0].label, "MunA");
        assert_eq!(rows[0].total, dec!(150));
        assert_eq!(rows[0].population, 150);
        assert_eq!(rows[0].percent_treated, Some(dec!(66.67)));
    }

    #[test]
    fn test_only_untreated_is_zero_not_missing() {
        let records = vec![rec("MunB", "430002", "0000001", 2020, NotTreated, dec!(80))];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        assert_eq!(rows[0].treated, dec!(0));
        assert_eq!(rows[0].percent_treated, Some(dec!(0)));
    }

    #[test]
    fn test_zero_total_is_not_applicable() {
        let records = vec![
            rec("MunC", "430003", "0000001", 2020, Treated, dec!(0)),
            rec("MunC", "430003", "0000001", 2020, NotTreated, dec!(0)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].percent_treated, None);
    }

    #[test]
    fn test_group_absent_in_year_is_excluded() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2019, Treated, dec!(10)),
            rec("MunB", "430002", "0000001", 2020, Treated, dec!(10)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["430002"]);
    }

    #[test]
    fn test_crs_level_sums_municipalities() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(100)),
            rec("MunA", "430001", "0000001", 2020, NotTreated, dec!(50)),
            rec("MunB", "430002", "0000001", 2020, Treated, dec!(50)),
            rec("MunC", "430003", "0000002", 2020, NotTreated, dec!(30)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Crs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "0000001");
        assert_eq!(rows[0].total, dec!(200));
        assert_eq!(rows[0].percent_treated, Some(dec!(75)));
        assert_eq!(rows[1].key, "0000002");
        assert_eq!(rows[1].percent_treated, Some(dec!(0)));
    }

    #[test]
    fn test_duplicate_status_rows_are_summed() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(10)),
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(20)),
            rec("MunA", "430001", "0000001", 2020, NotTreated, dec!(5.5)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        assert_eq!(rows[0].treated, dec!(30));
        assert_eq!(rows[0].total, dec!(35.5));
        // 35.5 rounds half-even to 36
        assert_eq!(rows[0].population, 36);
    }

    #[test]
    fn test_total_equals_sum_over_statuses() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(123.4)),
            rec("MunA", "430001", "0000001", 2020, NotTreated, dec!(76.6)),
            rec("MunA", "430001", "0000001", 2021, Treated, dec!(1)),
        ];
        let expected: Decimal = records.iter().filter(|r| r.year == 2020).map(|r| r.population).sum();
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        assert_eq!(rows[0].total, expected);
    }

    #[test]
    fn test_percent_bounds() {
        for (t, n) in [(dec!(0), dec!(1)), (dec!(1), dec!(0)), (dec!(1), dec!(2)), (dec!(999), dec!(1))] {
            let p = StatusTotals { treated: t, not_treated: n }.percent_treated().unwrap();
            assert!(p >= dec!(0) && p <= dec!(100), "{p}");
        }
    }

    #[test]
    fn test_summarize_metrics() {
        let records = vec![
            rec("MunA", "430001", "0000001", 2020, Treated, dec!(100)),
            rec("MunB", "430002", "0000002", 2020, NotTreated, dec!(300)),
        ];
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Crs);
        let m = summarize(&rows);
        assert_eq!(m.percent_treated, Some(dec!(25)));
        assert_eq!(m.population, 400);
        assert_eq!(m.groups, 2);

        let empty = summarize(&[]);
        assert_eq!(empty.percent_treated, None);
        assert_eq!(empty.population, 0);
    }
}
