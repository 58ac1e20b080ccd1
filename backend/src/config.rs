use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub model: ModelConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the segmentation weights file. When absent or unreadable the
    /// engine degrades to the deterministic placeholder (if enabled).
    pub weights_path: Option<PathBuf>,
    /// Model input resolution, used directly by the placeholder path. When
    /// real weights are loaded the resolution comes from the weights header.
    pub input_size: u32,
    pub inference_timeout_ms: u64,
    /// Permit the placeholder segmentation when no usable weights exist.
    pub fallback_enabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: None,
            input_size: 256,
            inference_timeout_ms: 10_000,
            fallback_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub moisture_min: f32,
    pub moisture_max: f32,
    /// Assumed soil moisture when neither the request nor the sensor hub
    /// supplies a reading.
    pub default_soil_moisture: f32,
    /// Pump duration for a manual START that does not specify one.
    pub default_manual_duration: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            moisture_min: 40.0,
            moisture_max: 70.0,
            default_soil_moisture: 50.0,
            default_manual_duration: 5,
        }
    }
}

impl SystemConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var("SYSTEM_CONFIG_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => {
                let manifest_dir =
                    std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(format!("{}/../config/system.yaml", manifest_dir))
            }
        };

        if !path.exists() {
            log::warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(&path)?;
        let config: SystemConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }
}
