//! Tract registry loading from GeoJSON.
//!
//! The registry is the universe of tracts the index is computed over and
//! fixes the output order. It is read from a GeoJSON `FeatureCollection`
//! (e.g. a TIGER/Line tract file converted with `ogr2ogr`), optionally
//! narrowed to one county by a property filter.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use tractrisk_common::{FieldValue, GeometryRegistry, RegistryEntry, Result, TractRiskError};

use crate::normalise::IdentifierNormaliser;

/// Keep only features whose `property` equals `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySpec {
    /// Path to the GeoJSON file
    pub path: PathBuf,
    /// Feature property holding the tract identifier
    #[serde(default = "default_id_property")]
    pub id_property: String,
    /// Optional feature filter, e.g. `COUNTYFP = "111"`
    #[serde(default)]
    pub filter: Option<PropertyFilter>,
}

fn default_id_property() -> String { "GEOID".to_string() }

impl RegistrySpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_property: default_id_property(),
            filter: None,
        }
    }
}

/// JSON property as a comparable string (`"111"` and `111` compare equal).
fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(|f| FieldValue::Number(f).to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build a registry from GeoJSON text.
///
/// Features without an identifier are skipped with a warning; a repeated
/// identifier keeps its first feature so every tract appears once.
pub fn parse_geojson(
    content: &str,
    spec: &RegistrySpec,
    normaliser: &IdentifierNormaliser,
) -> Result<GeometryRegistry> {
    let doc: Value = serde_json::from_str(content)?;

    if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(TractRiskError::GeoJson(
            "expected a FeatureCollection at the top level".to_string(),
        ));
    }
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| TractRiskError::GeoJson("FeatureCollection has no features array".to_string()))?;

    let mut seen: HashSet<String> = HashSet::with_capacity(features.len());
    let mut entries = Vec::with_capacity(features.len());
    let mut filtered_out = 0usize;

    for (i, feature) in features.iter().enumerate() {
        let props = feature.get("properties").unwrap_or(&Value::Null);

        if let Some(ref filter) = spec.filter {
            let matches = props
                .get(&filter.property)
                .and_then(property_text)
                .is_some_and(|v| v == filter.value);
            if !matches {
                filtered_out += 1;
                continue;
            }
        }

        let tract_id = match props.get(&spec.id_property).and_then(property_text) {
            Some(raw) => normaliser.normalise_str(&raw),
            None => {
                warn!(feature = i, property = %spec.id_property, "Feature has no identifier, skipped");
                continue;
            }
        };
        if tract_id.is_empty() {
            warn!(feature = i, "Feature has an empty identifier, skipped");
            continue;
        }
        if !seen.insert(tract_id.clone()) {
            warn!(tract_id = %tract_id, "Duplicate tract in registry, keeping first feature");
            continue;
        }

        entries.push(RegistryEntry {
            tract_id,
            geometry: feature.get("geometry").cloned().unwrap_or(Value::Null),
        });
    }

    info!(tracts = entries.len(), filtered_out, "Tract registry built");
    Ok(GeometryRegistry::new(entries))
}

/// Load the registry from disk.
pub async fn load_registry(
    spec: &RegistrySpec,
    normaliser: &IdentifierNormaliser,
) -> Result<GeometryRegistry> {
    let content = tokio::fs::read_to_string(&spec.path).await.map_err(|e| {
        TractRiskError::Config(format!(
            "failed to read tract registry {}: {e}",
            spec.path.display()
        ))
    })?;
    parse_geojson(&content, spec, normaliser)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "GEOID": "21111000100", "COUNTYFP": "111" },
                    "geometry": { "type": "Polygon", "coordinates": [[[-85.7, 38.2], [-85.6, 38.2], [-85.6, 38.3], [-85.7, 38.2]]] }
                },
                {
                    "type": "Feature",
                    "properties": { "GEOID": "21067000100", "COUNTYFP": "067" },
                    "geometry": null
                },
                {
                    "type": "Feature",
                    "properties": { "GEOID": 21111000200u64, "COUNTYFP": "111" },
                    "geometry": null
                },
                {
                    "type": "Feature",
                    "properties": { "GEOID": "21111000100", "COUNTYFP": "111" },
                    "geometry": null
                },
                {
                    "type": "Feature",
                    "properties": { "COUNTYFP": "111" },
                    "geometry": null
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_parse_with_county_filter() {
        let mut spec = RegistrySpec::new("unused.geojson");
        spec.filter = Some(PropertyFilter { property: "COUNTYFP".into(), value: "111".into() });

        let registry = parse_geojson(&sample(), &spec, &IdentifierNormaliser::default()).unwrap();
        let ids: Vec<&str> = registry.iter().map(|e| e.tract_id.as_str()).collect();
        assert_eq!(ids, vec!["21111000100", "21111000200"]);
        assert_eq!(registry.entries[0].geometry["type"], "Polygon");
    }

    #[test]
    fn test_parse_without_filter_keeps_order() {
        let spec = RegistrySpec::new("unused.geojson");
        let registry = parse_geojson(&sample(), &spec, &IdentifierNormaliser::default()).unwrap();
        let ids: Vec<&str> = registry.iter().map(|e| e.tract_id.as_str()).collect();
        assert_eq!(ids, vec!["21111000100", "21067000100", "21111000200"]);
    }

    #[test]
    fn test_rejects_non_feature_collection() {
        let spec = RegistrySpec::new("unused.geojson");
        let err = parse_geojson(r#"{"type":"Feature"}"#, &spec, &IdentifierNormaliser::default());
        assert!(matches!(err, Err(TractRiskError::GeoJson(_))));
    }

    #[tokio::test]
    async fn test_load_registry_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracts.geojson");
        std::fs::write(&path, sample()).unwrap();

        let registry = load_registry(&RegistrySpec::new(&path), &IdentifierNormaliser::default())
            .await
            .unwrap();
        assert_eq!(registry.len(), 3);
    }
}
