use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::network::activation::Activation;

pub type ConfigMap = FxHashMap<String, Value>;

/// Trainer settings, read from a flat map of dotted keys
/// (`training.batch_size`, `model.input_size`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(rename = "training.batch_size")]
    pub batch_size: usize,
    #[serde(rename = "training.gamma")]
    pub gamma: f64,
    #[serde(rename = "training.eps_start")]
    pub eps_start: f64,
    #[serde(rename = "training.eps_end")]
    pub eps_end: f64,
    #[serde(rename = "training.eps_decay")]
    pub eps_decay: f64,
    #[serde(rename = "training.lr")]
    pub learning_rate: f64,
    #[serde(rename = "training.tau")]
    pub tau: f64,
    /// Placement hint only, everything runs on the host.
    #[serde(rename = "training.device")]
    pub device: String,
    #[serde(rename = "training.epochs")]
    pub epochs: u64,
    #[serde(rename = "training.load_model")]
    pub load_model: bool,
    #[serde(rename = "training.load_path", default)]
    pub load_path: Option<PathBuf>,
    #[serde(rename = "training.reward_weight")]
    pub reward_weight: f64,
    #[serde(rename = "training.save_interval")]
    pub save_interval: u64,
    #[serde(rename = "training.output_path")]
    pub output_path: PathBuf,
    #[serde(rename = "training.memory_size", default = "default_memory_size")]
    pub memory_size: usize,
    #[serde(rename = "training.seed", default = "default_seed")]
    pub seed: u64,
    #[serde(rename = "model.input_size", default)]
    pub input_size: Option<usize>,
    #[serde(rename = "model.hidden_sizes", default = "default_hidden_sizes")]
    pub hidden_sizes: Vec<usize>,
    #[serde(rename = "model.hidden_activation", default)]
    pub hidden_activation: Activation,
}

fn default_memory_size() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

fn default_hidden_sizes() -> Vec<usize> {
    vec![64, 64]
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

impl TrainerConfig {
    pub fn from_map(map: ConfigMap) -> Result<Self, ConfigError> {
        let object: serde_json::Map<String, Value> = map.into_iter().collect();
        let config: Self = serde_json::from_value(Value::Object(object))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON object of flat dotted keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map: ConfigMap = serde_json::from_str(&text)?;
        Self::from_map(map)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(invalid("training.batch_size", "must be positive"));
        }
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(invalid("training.gamma", format!("{} is outside (0, 1)", self.gamma)));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(invalid("training.tau", format!("{} is outside (0, 1]", self.tau)));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("training.lr", "must be a positive number"));
        }
        if !(0.0..=1.0).contains(&self.reward_weight) {
            return Err(invalid(
                "training.reward_weight",
                format!("{} is outside [0, 1]", self.reward_weight),
            ));
        }
        for (key, value) in [
            ("training.eps_start", self.eps_start),
            ("training.eps_end", self.eps_end),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, format!("{} is outside [0, 1]", value)));
            }
        }
        if !(self.eps_decay > 0.0) {
            return Err(invalid("training.eps_decay", "must be positive"));
        }
        if self.epochs == 0 {
            return Err(invalid("training.epochs", "must be positive"));
        }
        if self.save_interval == 0 {
            return Err(invalid("training.save_interval", "must be positive"));
        }
        if self.memory_size < self.batch_size {
            return Err(invalid(
                "training.memory_size",
                format!("{} cannot hold a batch of {}", self.memory_size, self.batch_size),
            ));
        }
        if self.load_model && self.load_path.is_none() {
            return Err(invalid("training.load_path", "required when training.load_model is set"));
        }
        if self.input_size == Some(0) {
            return Err(invalid("model.input_size", "must be positive"));
        }
        if self.hidden_sizes.contains(&0) {
            return Err(invalid("model.hidden_sizes", "layers cannot be empty"));
        }
        Ok(())
    }
}
