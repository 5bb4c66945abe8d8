use serde::{Deserialize, Serialize};

use trickstep_core::clock::FrameConfig;

use crate::flow::FlowConfig;
use crate::physics::PhysicsConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRICKSTEP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/trickstep.toml";

/// Tunables for the simulation and the flow around it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub flow: FlowConfig,
    pub frame: FrameConfig,
}

impl SimConfig {
    /// Load config from the file named by `TRICKSTEP_CONFIG` (or the default
    /// path), falling back to defaults.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {path}");
                    config
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                Self::default()
            },
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
