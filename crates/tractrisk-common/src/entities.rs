/// Core tabular and geographic types shared by the loaders, the normaliser
/// and the aggregator. Tables are column-ordered; rows are positional.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single cell: numeric, free text, or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

/// Cell spellings treated as missing, compared case-insensitively.
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "-"];

impl FieldValue {
    /// Parse a raw cell from a text source (CSV, spreadsheet export).
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
            return FieldValue::Null;
        }
        // Zero-padded codes ("021", "01001020100") are identifiers, not numbers.
        if trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.") {
            return FieldValue::Text(raw.to_string());
        }
        match trimmed.replace(',', "").parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            Ok(_) => FieldValue::Null,
            Err(_) => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view; `None` for text and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric reading of the cell, including text that is a number kept
    /// as text by [`FieldValue::parse_cell`] (`"05"`, `"007"`).
    pub fn to_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(t) => t
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            FieldValue::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Identifiers stored as floats must not grow a ".0" tail.
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(n: Option<f64>) -> Self {
        n.map(FieldValue::Number).unwrap_or(FieldValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A table as it comes out of a loader: headers untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

/// A named table with normalised column names, ready to be joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Dataset {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`), `Null` when the row is short.
    pub fn value(&self, row: usize, column: usize) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Geometry registry
// ---------------------------------------------------------------------------

/// One tract of the geographic universe. Geometry is an opaque GeoJSON
/// geometry object; only the identifier takes part in scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub tract_id: String,
    pub geometry: serde_json::Value,
}

/// Ordered set of tracts; the registry order is the output order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryRegistry {
    pub entries: Vec<RegistryEntry>,
}

impl GeometryRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    /// Registry without geometry, handy for tests and tabular-only runs.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: ids
                .into_iter()
                .map(|id| RegistryEntry {
                    tract_id: id.into(),
                    geometry: serde_json::Value::Null,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
