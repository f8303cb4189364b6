use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::crossing::CrossingGate;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Orion context broker (live vehicle positions).
    pub orion_url: String,
    /// Base URL of the Montevideo transit topology service.
    pub montevideo_url: String,
    /// Public base URL of this service, used to build the webhook callback.
    pub public_url: String,
    /// Path to the semicolon-delimited schedule dataset.
    #[serde(default = "Config::default_schedule_path")]
    pub schedule_path: PathBuf,
    /// Search radius for "buses near stop" live queries (default: 300)
    #[serde(default = "Config::default_near_max_distance_meters")]
    pub near_max_distance_meters: u32,
    /// Reproduce the historical asymmetric crossing gate instead of the
    /// corrected symmetric one. Defaults to false.
    #[serde(default)]
    pub legacy_crossing_gate: bool,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn crossing_gate(&self) -> CrossingGate {
        if self.legacy_crossing_gate {
            CrossingGate::Legacy
        } else {
            CrossingGate::Symmetric
        }
    }

    fn default_schedule_path() -> PathBuf {
        PathBuf::from("data/uptu_pasada_circular.csv")
    }

    fn default_near_max_distance_meters() -> u32 {
        300
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
