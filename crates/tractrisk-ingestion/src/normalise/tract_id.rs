//! Census tract identifier normalisation.
//!
//! Usage:
//! ```ignore
//! let normaliser = IdentifierNormaliser::default();
//! assert_eq!(normaliser.normalise_str("1400000US21111012300"), "21111012300");
//! let dataset = normaliser.normalise_table(raw_table);
//! ```

use serde::{Deserialize, Serialize};
use tractrisk_common::{Dataset, FieldValue, RawTable};

use super::field_name::{dedupe_names, normalise_field_name};

/// Census summary-level prefix carried by ACS-style tract GEO_IDs.
pub const CENSUS_TRACT_PREFIX: &str = "1400000US";

/// Normalised name of the identifier column in every dataset.
pub const DEFAULT_JOIN_KEY: &str = "tractid";

/// Canonicalises tract identifiers and dataset headers.
/// Cheap to clone; build once from config and pass by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierNormaliser {
    /// Literal prefixes stripped from the start of an identifier (case-sensitive)
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    /// Normalised column name holding the identifier
    #[serde(default = "default_join_key")]
    pub join_key: String,
}

fn default_prefixes() -> Vec<String> { vec![CENSUS_TRACT_PREFIX.to_string()] }
fn default_join_key() -> String { DEFAULT_JOIN_KEY.to_string() }

impl Default for IdentifierNormaliser {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
            join_key: default_join_key(),
        }
    }
}

impl IdentifierNormaliser {
    pub fn new(prefixes: Vec<String>, join_key: &str) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
            join_key: normalise_field_name(join_key),
        }
    }

    // ── Identifiers ───────────────────────────────────────────────────────────

    /// Canonical identifier for any cell value. Never fails: a null or
    /// unusable value yields an empty or best-effort string that simply
    /// matches nothing downstream.
    pub fn normalise(&self, raw: &FieldValue) -> String {
        match raw {
            FieldValue::Text(s) => self.normalise_str(s),
            other => self.normalise_str(&other.to_string()),
        }
    }

    /// Strip known prefixes and surrounding whitespace until nothing changes,
    /// so the result is a fixed point: `normalise(normalise(x)) == normalise(x)`.
    pub fn normalise_str(&self, raw: &str) -> String {
        let mut s = raw.trim();
        while let Some(rest) = self
            .prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| s.strip_prefix(p.as_str()))
        {
            s = rest.trim();
        }
        s.to_string()
    }

    // ── Tables ────────────────────────────────────────────────────────────────

    /// Normalise every header and every identifier of a loaded table.
    ///
    /// Headers that collide after normalisation are suffixed (`_2`, `_3`, ...)
    /// rather than merged; the first header equal to the join key stays the
    /// identifier column. A table without that column is passed through with
    /// its headers normalised; the aggregator reports and skips it.
    pub fn normalise_table(&self, raw: RawTable) -> Dataset {
        let columns = dedupe_names(raw.headers.iter().map(|h| normalise_field_name(h)));
        let key_idx = columns.iter().position(|c| *c == self.join_key);

        let rows = raw
            .rows
            .into_iter()
            .map(|mut row| {
                if let Some(cell) = key_idx.and_then(|i| row.get_mut(i)) {
                    *cell = FieldValue::Text(self.normalise(cell));
                }
                row
            })
            .collect();

        match key_idx {
            Some(_) => tracing::debug!(dataset = %raw.name, columns = columns.len(), "Normalised dataset"),
            None => tracing::warn!(dataset = %raw.name, join_key = %self.join_key, "Dataset has no join key column after normalisation"),
        }

        Dataset {
            name: raw.name,
            columns,
            rows,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
