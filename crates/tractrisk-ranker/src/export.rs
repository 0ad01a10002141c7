//! Presentation-ready views of a scored table.
//!
//! Nothing here renders; it prepares what a map or table view needs: the
//! selected columns as CSV, a GeoJSON `FeatureCollection` with the score as
//! a property, and the score domain for a colour scale. Unscored tracts are
//! written as empty cells / JSON `null` so the viewer can grey them out.

use std::io::Write;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tractrisk_common::{Result, TractRiskError};

use crate::table::{OutputTable, RISK_INDEX_COLUMN, TRACT_ID_COLUMN};

/// Score domain and coverage of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub scored: usize,
    pub unscored: usize,
}

impl RiskSummary {
    pub fn from_table(table: &OutputTable) -> Self {
        let scores: Vec<f64> = table.rows().iter().filter_map(|r| r.risk_index).collect();
        let min = scores.iter().copied().reduce(f64::min);
        let max = scores.iter().copied().reduce(f64::max);
        let mean = (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);
        Self {
            min,
            max,
            mean,
            scored: scores.len(),
            unscored: table.len() - scores.len(),
        }
    }

    /// False when no tract has a score ("risk index could not be calculated").
    pub fn has_scores(&self) -> bool {
        self.scored > 0
    }
}

/// Requested columns that exist in the table, in request order.
fn existing_columns<'a>(table: &OutputTable, columns: &'a [String]) -> Vec<(&'a str, usize)> {
    columns
        .iter()
        .filter_map(|c| table.column_index(c).map(|i| (c.as_str(), i)))
        .collect()
}

/// Write `tractid_short`, the requested columns that exist, and `risk_index`.
pub fn write_csv<W: Write>(table: &OutputTable, columns: &[String], writer: W) -> Result<()> {
    let selected = existing_columns(table, columns);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![TRACT_ID_COLUMN];
    header.extend(selected.iter().map(|(name, _)| *name));
    header.push(RISK_INDEX_COLUMN);
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(selected.len() + 2);
        record.push(row.tract_id.clone());
        for (_, idx) in &selected {
            record.push(row.values[*idx].to_string());
        }
        record.push(row.risk_index.map(|s| s.to_string()).unwrap_or_default());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(table: &OutputTable, columns: &[String]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, columns, &mut buf)?;
    String::from_utf8(buf).map_err(|e| TractRiskError::Other(e.into()))
}

/// GeoJSON `FeatureCollection`, one feature per tract, with the identifier,
/// the requested columns and `risk_index` as properties.
pub fn to_geojson(table: &OutputTable, columns: &[String]) -> Value {
    let selected = existing_columns(table, columns);
    let features: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let mut props = Map::new();
            props.insert(TRACT_ID_COLUMN.to_string(), Value::String(row.tract_id.clone()));
            for (name, idx) in &selected {
                props.insert(name.to_string(), serde_json::to_value(&row.values[*idx]).unwrap_or(Value::Null));
            }
            props.insert(RISK_INDEX_COLUMN.to_string(), json!(row.risk_index));
            json!({
                "type": "Feature",
                "properties": props,
                "geometry": row.geometry,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// The `n` highest-scoring tracts, best first. Ties keep registry order.
pub fn top_n(table: &OutputTable, n: usize) -> Vec<(&str, f64)> {
    let mut scored: Vec<(&str, f64)> = table
        .rows()
        .iter()
        .filter_map(|r| r.risk_index.map(|s| (r.tract_id.as_str(), s)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(n);
    scored
}
