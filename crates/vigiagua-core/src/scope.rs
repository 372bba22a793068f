use std::collections::BTreeSet;

use crate::aggregate::{CoverageRow, HierarchyLevel};
use crate::normalize::normalize_region_code;
use crate::records::SupplyRecord;
use crate::trend::HistoricalSeries;

/// IBGE codes of the municipalities that belong to the group `key` at
/// `level`, according to the supply records of any year.
///
/// Boundary data is never consulted: a municipality that only exists on the
/// map is not a member of anything.
pub fn members_of(records: &[SupplyRecord], level: HierarchyLevel, key: &str) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| level.key_of(r) == key)
        .map(|r| r.municipality_code.clone())
        .collect()
}

/// Municipality codes of a CRS, accepting the CRS code in any width.
pub fn municipalities_in_crs(records: &[SupplyRecord], crs: &str) -> BTreeSet<String> {
    members_of(records, HierarchyLevel::Crs, &normalize_region_code(crs))
}

/// Keep municipality-level rows whose key is in `members`.
pub fn restrict_rows(rows: Vec<CoverageRow>, members: &BTreeSet<String>) -> Vec<CoverageRow> {
    rows.into_iter().filter(|r| members.contains(&r.key)).collect()
}

/// Keep municipality-level series whose key is in `members`.
pub fn restrict_series(series: Vec<HistoricalSeries>, members: &BTreeSet<String>) -> Vec<HistoricalSeries> {
    series.into_iter().filter(|s| members.contains(&s.key)).collect()
}

/// Distinct group keys at `level`, sorted.
pub fn group_keys(records: &[SupplyRecord], level: HierarchyLevel) -> BTreeSet<String> {
    records.iter().map(|r| level.key_of(r).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_year;
    use crate::records::DisinfectionStatus;
    use crate::trend::build_trends;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn rec(mun: &str, code: &str, crs: &str, year: i32) -> SupplyRecord {
        SupplyRecord {
            municipality: mun.to_string(),
            municipality_code: code.to_string(),
            health_region: "R".to_string(),
            crs: crs.to_string(),
            macro_region: "M".to_string(),
            health_area: None,
            supply_type: "SAC".to_string(),
            year,
            status: DisinfectionStatus::Treated,
            population: dec!(10),
        }
    }

    fn sample() -> Vec<SupplyRecord> {
        vec![
            rec("A", "430001", "0000001", 2020),
            rec("B", "430002", "0000001", 2019),
            rec("C", "430003", "0000002", 2020),
        ]
    }

    #[test]
    fn test_crs_members_from_any_year() {
        let members = municipalities_in_crs(&sample(), "1");
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["430001", "430002"]);
    }

    #[test]
    fn test_restrict_rows_to_members() {
        let records = sample();
        let members = municipalities_in_crs(&records, "0000001");
        let rows = aggregate_year(&records, 2020, HierarchyLevel::Municipality);
        let restricted = restrict_rows(rows, &members);
        // B has no 2020 record, C is outside the CRS
        let labels: Vec<&str> = restricted.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A"]);
    }

    #[test]
    fn test_unknown_region_is_empty() {
        let members = municipalities_in_crs(&sample(), "9999999");
        assert!(members.is_empty());
        let rows = aggregate_year(&sample(), 2020, HierarchyLevel::Municipality);
        assert!(restrict_rows(rows, &members).is_empty());
    }

    #[test]
    fn test_homonyms_in_other_crs_stay_out() {
        let mut records = sample();
        records.push(rec("A", "439999", "0000002", 2020));
        let members = municipalities_in_crs(&records, "1");
        let rows = restrict_rows(aggregate_year(&records, 2020, HierarchyLevel::Municipality), &members);
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["430001"]);

        let series = restrict_series(build_trends(&records, HierarchyLevel::Municipality).series, &members);
        let keys: Vec<&str> = series.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["430001", "430002"]);
    }

    #[test]
    fn test_group_keys_sorted() {
        let keys: Vec<String> = group_keys(&sample(), HierarchyLevel::Crs).into_iter().collect();
        assert_eq!(keys, vec!["0000001", "0000002"]);
    }
}
