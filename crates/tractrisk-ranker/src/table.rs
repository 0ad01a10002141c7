//! The joined, scored table handed to the presentation layer.
//!
//! One row per registry tract, in registry order. Field columns are added
//! by the join; the identifier, geometry and `risk_index` live outside the
//! column list and their names are reserved.

use std::collections::HashMap;

use serde::Serialize;
use tractrisk_common::{FieldValue, GeometryRegistry};

/// Output name of the tract identifier.
pub const TRACT_ID_COLUMN: &str = "tractid_short";

/// Output name of the composite score.
pub const RISK_INDEX_COLUMN: &str = "risk_index";

const RESERVED: &[&str] = &[TRACT_ID_COLUMN, RISK_INDEX_COLUMN, "geometry"];

/// A joined field column and the dataset it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputRow {
    pub tract_id: String,
    pub geometry: serde_json::Value,
    pub values: Vec<FieldValue>,
    pub risk_index: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputTable {
    columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    rows: Vec<OutputRow>,
}

impl OutputTable {
    /// Base projection of the registry: identifier and geometry only.
    pub fn from_registry(registry: &GeometryRegistry) -> Self {
        Self {
            columns: vec![],
            index: HashMap::new(),
            rows: registry
                .iter()
                .map(|e| OutputRow {
                    tract_id: e.tract_id.clone(),
                    geometry: e.geometry.clone(),
                    values: vec![],
                    risk_index: None,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [OutputRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True if `name` cannot be used for a new column.
    pub fn is_taken(&self, name: &str) -> bool {
        RESERVED.contains(&name) || self.has_column(name)
    }

    /// Value of `column` for the row of `tract_id`.
    pub fn value(&self, tract_id: &str, column: &str) -> Option<&FieldValue> {
        let idx = self.column_index(column)?;
        self.row(tract_id).and_then(|r| r.values.get(idx))
    }

    pub fn row(&self, tract_id: &str) -> Option<&OutputRow> {
        self.rows.iter().find(|r| r.tract_id == tract_id)
    }

    pub fn risk_index(&self, tract_id: &str) -> Option<f64> {
        self.row(tract_id).and_then(|r| r.risk_index)
    }

    /// Append a column filled with nulls; returns its index.
    /// Callers pick a free name first (see [`is_taken`](Self::is_taken)).
    pub(crate) fn push_column(&mut self, name: String, source: &str) -> usize {
        debug_assert!(!self.is_taken(&name), "column {name} already taken");
        let idx = self.columns.len();
        self.index.insert(name.clone(), idx);
        self.columns.push(Column {
            name,
            source: source.to_string(),
        });
        for row in &mut self.rows {
            row.values.push(FieldValue::Null);
        }
        idx
    }
}
