//! Scoring profiles for the composite risk index.
//!
//! A profile is what an analyst edits: which datasets take part (in
//! inclusion order), which columns carry which weight, and how missing
//! values and duplicate identifiers are handled. Profiles are plain
//! YAML/JSON/TOML and are re-read for every scoring run; nothing in the
//! core keeps selection state between runs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TractRiskError};

/// Complete scoring profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Profile name, used for output file names and log lines
    #[serde(default = "default_profile_name")]
    pub name: String,

    /// Datasets to include, in join order. Empty means every loaded dataset.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Field name → weight. Fields with weight <= 0 are ignored.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Missing value and duplicate handling
    #[serde(default)]
    pub scoring: ScoringOptions,

    /// Output options
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_profile_name() -> String { "default".to_string() }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            sources: vec![],
            weights: BTreeMap::new(),
            scoring: ScoringOptions::default(),
            output: OutputConfig::default(),
        }
    }
}

// ── Scoring Options ───────────────────────────────────────────────────────────

/// How a null value in a weighted column enters the weighted mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Null counts as 0, its weight stays in the denominator.
    /// A row with every weighted value null gets no score.
    #[default]
    ZeroFill,
    /// Any null weighted value leaves the row unscored.
    Propagate,
    /// Nulls are skipped; the denominator only sums present weights.
    Renormalise,
}

/// What to do with a dataset that repeats a tract identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Leave the dataset out of the join.
    #[default]
    Reject,
    /// Keep the first row seen for each identifier.
    KeepFirst,
    /// Average numeric columns over the repeated rows.
    Mean,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringOptions {
    #[serde(default)]
    pub missing_values: MissingValuePolicy,

    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

// ── Output Configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    #[serde(alias = "geojson")]
    GeoJson,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Number of highest-scoring tracts to log after a run
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_format() -> OutputFormat { OutputFormat::Both }
fn default_top_n() -> usize { 10 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            top_n: default_top_n(),
        }
    }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl IndexConfig {
    /// Load from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load by file extension (`.yaml`/`.yml`, `.json`, `.toml`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            Some("json") => Self::from_json(path),
            Some("toml") => Self::from_toml(path),
            other => Err(TractRiskError::Config(format!(
                "unsupported profile extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Save to YAML file
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Datasets to join, in order. An empty `sources` list selects all of
    /// `available`; unknown names are dropped with a warning.
    pub fn selected_sources(&self, available: &[String]) -> Vec<String> {
        if self.sources.is_empty() {
            return available.to_vec();
        }
        self.sources
            .iter()
            .filter(|s| {
                let known = available.contains(s);
                if !known {
                    tracing::warn!(profile = %self.name, source = %s, "Selected source is not loaded");
                }
                known
            })
            .cloned()
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
