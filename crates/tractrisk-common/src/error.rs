use thiserror::Error;

#[derive(Debug, Error)]
pub enum TractRiskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    /// A weighted column holds a value that cannot be read as a number.
    #[error("Non-numeric value {value:?} in weighted field '{field}' for tract '{tract_id}'")]
    NonNumericValue {
        field: String,
        tract_id: String,
        value: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TractRiskError>;
