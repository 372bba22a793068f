//! Historical percent-treated series per group, aligned on one year axis.
//!
//! Numerator and denominator are accumulated together per (group, year), so
//! a group's series can never be shifted against another group's when their
//! year coverage differs: a year without records is an explicit `None`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::{HierarchyLevel, StatusTotals};
use crate::records::SupplyRecord;
use crate::types::{Percent, Year};

/// Ascending, de-duplicated years present in a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearAxis(Vec<Year>);

impl YearAxis {
    pub fn from_records(records: &[SupplyRecord]) -> Self {
        let years: BTreeSet<Year> = records.iter().map(|r| r.year).collect();
        Self(years.into_iter().collect())
    }

    pub fn years(&self) -> &[Year] {
        &self.0
    }

    pub fn contains(&self, year: Year) -> bool {
        self.0.binary_search(&year).is_ok()
    }

    pub fn latest(&self) -> Option<Year> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: Year,
    pub percent_treated: Option<Percent>,
}

/// Percent-treated history of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub key: String,
    pub label: String,
    /// One point per axis year, ascending
    pub points: Vec<TrendPoint>,
}

impl HistoricalSeries {
    /// Position-aligned values for sparkline rendering.
    pub fn sparkline(&self) -> Vec<Option<Percent>> {
        self.points.iter().map(|p| p.percent_treated).collect()
    }

    pub fn percent_for(&self, year: Year) -> Option<Percent> {
        self.points
            .iter()
            .find(|p| p.year == year)
            .and_then(|p| p.percent_treated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendTable {
    pub level: HierarchyLevel,
    pub axis: YearAxis,
    /// Ordered by group key
    pub series: Vec<HistoricalSeries>,
}

impl TrendTable {
    pub fn get(&self, key: &str) -> Option<&HistoricalSeries> {
        self.series
            .binary_search_by(|s| s.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.series[i])
    }
}

/// Build the historical series of every group at `level` over the full,
/// year-unfiltered record set.
pub fn build_trends(records: &[SupplyRecord], level: HierarchyLevel) -> TrendTable {
    let axis = YearAxis::from_records(records);

    let mut by_group: BTreeMap<String, (String, BTreeMap<Year, StatusTotals>)> = BTreeMap::new();
    for record in records {
        let (_, per_year) = by_group
            .entry(level.key_of(record).to_string())
            .or_insert_with(|| (level.label_of(record).to_string(), BTreeMap::new()));
        per_year
            .entry(record.year)
            .or_default()
            .add(record.status, record.population);
    }

    let series = by_group
        .into_iter()
        .map(|(key, (label, per_year))| {
            let points = axis
                .years()
                .iter()
                .map(|&year| TrendPoint {
                    year,
                    percent_treated: per_year.get(&year).and_then(StatusTotals::percent_treated),
                })
                .collect();
            HistoricalSeries { key, label, points }
        })
        .collect::<Vec<_>>();

    tracing::debug!(?level, groups = series.len(), years = axis.len(), "built trends");
    TrendTable { level, axis, series }
}
