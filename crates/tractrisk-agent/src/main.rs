//! Composite risk index over census tracts.
//! Entry point for the scoring binary.

mod config;
mod pipeline;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tractrisk_common::IndexConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tractrisk=debug,info")),
        )
        .init();

    info!("tractrisk starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match config::Config::load() {
        Ok(c) => {
            info!("Configuration loaded. {} data sources, {} profiles",
                c.data.sources.len(), c.profiles.len());
            c
        }
        Err(e) => {
            warn!("Could not load tractrisk.toml: {e}");
            warn!("Copy tractrisk.example.toml to tractrisk.toml and edit it.");
            return Ok(());
        }
    };

    let data = pipeline::load_data(&config).await?;

    let mut failed = 0usize;
    for path in &config.profiles {
        let profile = IndexConfig::from_path(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        match pipeline::run_profile(&data, &profile, &config) {
            Ok(report) => info!(
                profile = %report.profile,
                outputs = report.outputs.len(),
                diagnostics = report.diagnostics.len(),
                "Profile written"
            ),
            Err(e) => {
                failed += 1;
                warn!(profile = %profile.name, "Profile failed: {e:#}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} profiles failed", config.profiles.len());
    }
    info!("All profiles scored.");
    Ok(())
}
