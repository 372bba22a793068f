use std::time::Instant;

use geojson::{Feature, GeoJson, Geometry};
use serde::{Deserialize, Serialize};

use crate::config::{BoundarySchema, SourceConfig};
use crate::error::VigiaguaError;
use crate::normalize::{canonical_code, municipality_join_key};
use crate::source::DataSource;
use crate::VigiaguaResult;

/// One municipal boundary polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolygon {
    /// Full administrative code (7-digit IBGE code with check digit)
    pub code: String,
    /// Display name
    pub name: String,
    pub geometry: Geometry,
}

impl BoundaryPolygon {
    /// Key matched against supply-record municipality codes.
    pub fn join_key(&self) -> String {
        municipality_join_key(&self.code)
    }
}

pub fn load_boundaries(config: &SourceConfig) -> VigiaguaResult<Vec<BoundaryPolygon>> {
    let source = DataSource::parse(&config.boundaries)?;
    let text = source.read_text()?;
    parse_boundaries(&text, &config.boundary_schema).map_err(|e| match e {
        VigiaguaError::Geometry(reason) => VigiaguaError::Load {
            origin: source.describe(),
            reason,
        },
        other => other,
    })
}

/// Parse a GeoJSON FeatureCollection of municipal polygons.
///
/// Every feature must carry a polygonal geometry and the configured code
/// property; the name property falls back to the code when missing.
pub fn parse_boundaries(text: &str, schema: &BoundarySchema) -> VigiaguaResult<Vec<BoundaryPolygon>> {
    let start = Instant::now();
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(VigiaguaError::Geometry(
                "expected a FeatureCollection".to_string(),
            ))
        }
    };

    let polygons = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| polygon_from_feature(i, feature, schema))
        .collect::<VigiaguaResult<Vec<_>>>()?;

    tracing::info!(
        polygons = polygons.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "parsed boundary polygons"
    );
    Ok(polygons)
}

fn polygon_from_feature(
    index: usize,
    feature: Feature,
    schema: &BoundarySchema,
) -> VigiaguaResult<BoundaryPolygon> {
    let code = feature
        .property(&schema.code)
        .and_then(property_text)
        .map(|c| canonical_code(&c))
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            VigiaguaError::Geometry(format!(
                "feature {index} has no '{}' property",
                schema.code
            ))
        })?;
    let name = feature
        .property(&schema.name)
        .and_then(property_text)
        .unwrap_or_else(|| code.clone());

    let geometry = feature
        .geometry
        .ok_or_else(|| VigiaguaError::Geometry(format!("feature {index} ({code}) has no geometry")))?;
    match geometry.value {
        geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_) => {}
        _ => {
            return Err(VigiaguaError::Geometry(format!(
                "feature {index} ({code}) is not a polygon"
            )))
        }
    }

    Ok(BoundaryPolygon { code, name, geometry })
}

fn property_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
