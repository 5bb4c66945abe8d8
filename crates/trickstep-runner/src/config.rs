use serde::{Deserialize, Serialize};

use crate::script::ScriptStep;

pub const RUNNER_CONFIG_ENV: &str = "TRICKSTEP_RUNNER_CONFIG";
pub const DEFAULT_RUNNER_CONFIG_PATH: &str = "config/runner.toml";

/// Headless run configuration, loaded from `config/runner.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Level pack to load; the built-in pack when unset.
    pub level_pack: Option<String>,
    /// JSON file holding persisted progress.
    pub progress_file: String,
    /// Global index of the level to play.
    pub level: usize,
    /// Simulated seconds per frame.
    pub fixed_step: f32,
    /// Hard stop, in frames, including fades and menus.
    pub max_frames: usize,
    /// Input timeline. The last step repeats once the script runs out.
    pub script: Vec<ScriptStep>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            level_pack: None,
            progress_file: "trickstep-progress.json".to_string(),
            level: 0,
            fixed_step: 1.0 / 60.0,
            max_frames: 3600,
            script: vec![ScriptStep {
                frames: 1,
                right: true,
                ..Default::default()
            }],
        }
    }
}

impl RunnerConfig {
    /// Load from `TRICKSTEP_RUNNER_CONFIG` or the default path, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let path = std::env::var(RUNNER_CONFIG_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_RUNNER_CONFIG_PATH.to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<RunnerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded runner configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    RunnerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                RunnerConfig::default()
            },
        };

        if let Ok(val) = std::env::var("TRICKSTEP_LEVEL")
            && let Ok(n) = val.parse::<usize>()
        {
            config.level = n;
        }
        if let Ok(pack) = std::env::var("TRICKSTEP_LEVEL_PACK")
            && !pack.is_empty()
        {
            config.level_pack = Some(pack);
        }
        config
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fixed_step.is_finite() && self.fixed_step > 0.0) {
            return Err("fixed_step must be > 0".to_string());
        }
        if self.max_frames == 0 {
            return Err("max_frames must be > 0".to_string());
        }
        Ok(())
    }
}
