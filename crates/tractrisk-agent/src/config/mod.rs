//! Configuration loading for tractrisk.
//! Reads tractrisk.toml from the current directory or path in TRACTRISK_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tractrisk_ingestion::{IdentifierNormaliser, RegistrySpec, SourceSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub normalise: IdentifierNormaliser,
    #[serde(default)]
    pub output: OutputDirConfig,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<PathBuf>,
}

fn default_profiles() -> Vec<PathBuf> { vec![PathBuf::from("profiles/default.yaml")] }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub registry: RegistrySpec,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDirConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "bool_true")]
    pub write_summary: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("./out") }
fn bool_true()          -> bool    { true }

impl Default for OutputDirConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_summary: true,
        }
    }
}


impl Config {
    /// Load configuration from tractrisk.toml.
    /// Checks TRACTRISK_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("TRACTRISK_CONFIG")
            .unwrap_or_else(|_| "tractrisk.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy tractrisk.example.toml to tractrisk.toml and edit it.",
                path
            );
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML; the join key is normalised like any dataset header.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.normalise = IdentifierNormaliser::new(
            std::mem::take(&mut config.normalise.prefixes),
            &config.normalise.join_key,
        );
        Ok(config)
    }
}
