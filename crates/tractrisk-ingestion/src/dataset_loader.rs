//! CSV dataset loading.
//!
//! Each data category (demographic, clinical, place, ...) arrives as its
//! own CSV export. A file is read into a [`RawTable`] with its headers
//! untouched; normalisation happens afterwards in
//! [`IdentifierNormaliser::normalise_table`](crate::IdentifierNormaliser::normalise_table).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tractrisk_common::{FieldValue, RawTable, Result, TractRiskError};

/// One tabular source as configured by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Dataset name, also used to suffix colliding column names
    pub name: String,
    /// Path to the CSV file
    pub path: PathBuf,
    /// Rows to discard before the header row (title banners etc.)
    #[serde(default)]
    pub skip_rows: usize,
    /// Maximum number of data rows to read (footnotes below the table)
    #[serde(default)]
    pub max_rows: Option<usize>,
}

impl SourceSpec {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            skip_rows: 0,
            max_rows: None,
        }
    }
}

/// Parse CSV text into a raw table.
pub fn parse_csv(
    name: &str,
    content: &str,
    skip_rows: usize,
    max_rows: Option<usize>,
) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records().skip(skip_rows);

    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|s| s.to_string()).collect(),
        None => {
            return Err(TractRiskError::Config(format!(
                "dataset '{name}' has no header row after skipping {skip_rows} rows"
            )))
        }
    };

    let mut rows = Vec::new();
    for result in records.take(max_rows.unwrap_or(usize::MAX)) {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<FieldValue> = record.iter().map(FieldValue::parse_cell).collect();
        row.resize(headers.len(), FieldValue::Null);
        rows.push(row);
    }

    debug!(dataset = %name, columns = headers.len(), rows = rows.len(), "Parsed CSV");
    Ok(RawTable {
        name: name.to_string(),
        headers,
        rows,
    })
}

/// Load one source from disk.
pub async fn load_source(spec: &SourceSpec) -> Result<RawTable> {
    let content = tokio::fs::read_to_string(&spec.path).await.map_err(|e| {
        TractRiskError::Config(format!(
            "failed to read dataset '{}' from {}: {e}",
            spec.name,
            spec.path.display()
        ))
    })?;
    parse_csv(&spec.name, &content, spec.skip_rows, spec.max_rows)
}

/// Load every configured source, in configuration order.
pub async fn load_sources(specs: &[SourceSpec]) -> Result<Vec<RawTable>> {
    let mut tables = Vec::with_capacity(specs.len());
    for spec in specs {
        let table = load_source(spec).await?;
        info!(dataset = %table.name, rows = table.rows.len(), "Loaded dataset");
        tables.push(table);
    }
    Ok(tables)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
