//! Load once, score many.
//!
//! Datasets and the tract registry are read a single time per process and
//! then shared read-only by every scoring profile; each profile is a fresh,
//! independent aggregation.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};
use tractrisk_common::{Dataset, GeometryRegistry, IndexConfig, OutputFormat};
use tractrisk_ingestion::{dataset_loader, registry_loader};
use tractrisk_ranker::export::{self, RiskSummary};
use tractrisk_ranker::{aggregate, AggregateOptions, Diagnostic, ScoreStatus, WeightMap};

use crate::config::Config;

/// Everything read from disk, normalised and ready to join.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub registry: GeometryRegistry,
    pub datasets: Vec<Dataset>,
}

impl LoadedData {
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }

    /// Datasets by name, in the order given.
    pub fn select(&self, names: &[String]) -> Vec<&Dataset> {
        names
            .iter()
            .filter_map(|n| self.datasets.iter().find(|d| &d.name == n))
            .collect()
    }
}

pub async fn load_data(config: &Config) -> anyhow::Result<LoadedData> {
    let registry = registry_loader::load_registry(&config.data.registry, &config.normalise)
        .await
        .context("Failed to load tract registry")?;

    let datasets = dataset_loader::load_sources(&config.data.sources)
        .await
        .context("Failed to load datasets")?
        .into_iter()
        .map(|raw| config.normalise.normalise_table(raw))
        .collect::<Vec<_>>();

    info!(tracts = registry.len(), datasets = datasets.len(), "Data loaded");
    Ok(LoadedData { registry, datasets })
}

/// What a profile run produced; also written as `<profile>.summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile: String,
    pub status: ScoreStatus,
    pub summary: RiskSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub outputs: Vec<PathBuf>,
}

pub fn run_profile(data: &LoadedData, profile: &IndexConfig, config: &Config) -> anyhow::Result<ProfileReport> {
    let sources = profile.selected_sources(&data.dataset_names());
    let datasets = data.select(&sources);
    let weights = WeightMap::from_profile(profile);
    let options = AggregateOptions::from_profile(profile, config.normalise.clone());

    info!(profile = %profile.name, datasets = datasets.len(), weights = weights.len(), "Scoring profile");
    let outcome = aggregate(&data.registry, &datasets, &weights, &options)
        .with_context(|| format!("Scoring profile '{}' failed", profile.name))?;

    for diagnostic in &outcome.diagnostics {
        warn!(profile = %profile.name, "{diagnostic}");
    }

    let summary = RiskSummary::from_table(&outcome.table);
    if summary.has_scores() {
        for (rank, (tract, score)) in export::top_n(&outcome.table, profile.output.top_n).iter().enumerate() {
            info!(profile = %profile.name, rank = rank + 1, tract = %tract, score = *score, "Top tract");
        }
    } else {
        warn!(profile = %profile.name, "Risk index could not be calculated for any tract");
    }

    let columns: Vec<String> = weights
        .active()
        .map(|(name, _)| name.to_string())
        .collect();

    std::fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output.dir))?;

    let mut outputs = Vec::new();
    if matches!(profile.output.format, OutputFormat::Csv | OutputFormat::Both) {
        let path = config.output.dir.join(format!("{}.csv", profile.name));
        let file = std::fs::File::create(&path).with_context(|| format!("Failed to create {path:?}"))?;
        export::write_csv(&outcome.table, &columns, file)?;
        outputs.push(path);
    }
    if matches!(profile.output.format, OutputFormat::GeoJson | OutputFormat::Both) {
        let path = config.output.dir.join(format!("{}.geojson", profile.name));
        std::fs::write(&path, serde_json::to_string(&export::to_geojson(&outcome.table, &columns))?)?;
        outputs.push(path);
    }

    let report = ProfileReport {
        profile: profile.name.clone(),
        status: outcome.status,
        summary,
        diagnostics: outcome.diagnostics,
        outputs,
    };

    if config.output.write_summary {
        let path = config.output.dir.join(format!("{}.summary.json", profile.name));
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    }

    info!(profile = %report.profile, scored = report.summary.scored, unscored = report.summary.unscored, "Profile done");
    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
