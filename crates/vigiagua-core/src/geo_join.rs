use std::collections::HashMap;

use geojson::{Feature, FeatureCollection, Geometry};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::aggregate::CoverageRow;
use crate::boundary::BoundaryPolygon;
use crate::types::Percent;

/// A boundary polygon with the coverage of its municipality, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedMapRow {
    pub code: String,
    pub join_key: String,
    pub name: String,
    pub geometry: Geometry,
    /// `None` when no supply record matched this polygon
    pub coverage: Option<CoverageRow>,
}

impl JoinedMapRow {
    pub fn percent_treated(&self) -> Option<Percent> {
        self.coverage.as_ref().and_then(|c| c.percent_treated)
    }

    pub fn is_matched(&self) -> bool {
        self.coverage.is_some()
    }
}

/// Left outer join of boundary polygons onto municipality-level coverage
/// rows: `join_key(polygon.code) == row.key`.
///
/// Output has exactly one row per polygon, in polygon order.
pub fn join_boundaries(boundaries: &[BoundaryPolygon], municipal_rows: &[CoverageRow]) -> Vec<JoinedMapRow> {
    let by_key: HashMap<&str, &CoverageRow> = municipal_rows
        .iter()
        .map(|row| (row.key.as_str(), row))
        .collect();

    let rows: Vec<JoinedMapRow> = boundaries
        .iter()
        .map(|polygon| {
            let join_key = polygon.join_key();
            let coverage = by_key.get(join_key.as_str()).map(|row| (*row).clone());
            JoinedMapRow {
                code: polygon.code.clone(),
                join_key,
                name: polygon.name.clone(),
                geometry: polygon.geometry.clone(),
                coverage,
            }
        })
        .collect();

    let unmatched = rows.iter().filter(|r| !r.is_matched()).count();
    if unmatched > 0 {
        tracing::debug!(unmatched, polygons = rows.len(), "boundaries without coverage data");
    }
    rows
}

/// Render joined rows as a FeatureCollection for the choropleth layer.
/// Statistics of unmatched rows are `null`.
pub fn to_feature_collection(rows: &[JoinedMapRow]) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|row| {
            let mut feature = Feature {
                bbox: None,
                geometry: Some(row.geometry.clone()),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("code", row.code.clone());
            feature.set_property("join_key", row.join_key.clone());
            feature.set_property("name", row.name.clone());
            feature.set_property(
                "percent_treated",
                row.percent_treated().and_then(|p| p.to_f64()),
            );
            feature.set_property("population", row.coverage.as_ref().map(|c| c.population));
            feature
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn polygon(code: &str, name: &str) -> BoundaryPolygon {
        BoundaryPolygon {
            code: code.to_string(),
            name: name.to_string(),
            geometry: Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]])),
        }
    }

    fn row(key: &str, pct: Option<rust_decimal::Decimal>) -> CoverageRow {
        CoverageRow {
            key: key.to_string(),
            label: format!("Mun {key}"),
            treated: dec!(10),
            not_treated: dec!(10),
            total: dec!(20),
            population: 20,
            percent_treated: pct,
        }
    }

    #[test]
    fn test_left_join_preserves_every_polygon() {
        let boundaries = vec![
            polygon("4300034", "Aceguá"),
            polygon("4314902", "Porto Alegre"),
            polygon("4399999", "Sem Dados"),
        ];
        let rows = vec![row("430003", Some(dec!(50))), row("431490", Some(dec!(50))), row("999999", None)];
        let joined = join_boundaries(&boundaries, &rows);

        assert_eq!(joined.len(), boundaries.len());
        assert_eq!(joined[0].join_key, "430003");
        assert!(joined[0].is_matched());
        assert_eq!(joined[1].percent_treated(), Some(dec!(50)));
        assert_eq!(joined[2].name, "Sem Dados");
        assert!(!joined[2].is_matched());
        assert_eq!(joined[2].percent_treated(), None);
    }

    #[test]
    fn test_empty_coverage_keeps_geometry() {
        let boundaries = vec![polygon("4300034", "Aceguá")];
        let joined = join_boundaries(&boundaries, &[]);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].geometry, boundaries[0].geometry);
    }

    #[test]
    fn test_feature_collection_properties() {
        let boundaries = vec![polygon("4300034", "Aceguá"), polygon("4399999", "Sem Dados")];
        let joined = join_boundaries(&boundaries, &[row("430003", Some(dec!(66.67)))]);
        let fc = to_feature_collection(&joined);
        assert_eq!(fc.features.len(), 2);

        let first = &fc.features[0];
        assert_eq!(first.property("name").and_then(|v| v.as_str()), Some("Aceguá"));
        let pct = first.property("percent_treated").and_then(|v| v.as_f64()).unwrap();
        assert!((pct - 66.67).abs() < 1e-9);
        assert_eq!(first.property("population").and_then(|v| v.as_u64()), Some(20));

        let second = &fc.features[1];
        assert!(second.property("percent_treated").unwrap().is_null());
        assert!(second.property("population").unwrap().is_null());
    }
}
