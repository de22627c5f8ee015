//! Configuration structures for training
//!
//! This module provides the training configuration read by the demo binary: the
//! momentum-SGD learning record plus the length and seeding of a run.

use crate::error::NetError;
use crate::layers::LearningParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a training run.
///
/// Every field is optional in the JSON file; missing fields take the defaults below.
///
/// # Example
///
/// ```json
/// {
///   "learning_rate": 0.2,
///   "momentum": 0.3,
///   "iterations": 50000,
///   "seed": 7,
///   "log_every": 10000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Step size of the weight update (default 0.2)
    pub learning_rate: f64,

    /// Fraction of the previous update carried into the next one (default 0.3)
    pub momentum: f64,

    /// Number of single-example training steps (default 50000)
    pub iterations: usize,

    /// Seed for weight initialization and sample order (default 7); 0 seeds from the clock
    pub seed: u64,

    /// Log the running loss every `log_every` steps; 0 disables progress logging
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            momentum: 0.3,
            iterations: 50_000,
            seed: 7,
            log_every: 10_000,
        }
    }
}

impl TrainingConfig {
    /// Learning record handed to the network.
    pub fn learning_params(&self) -> LearningParams {
        LearningParams::new(self.learning_rate, self.momentum)
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a `TrainingConfig`.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read, the JSON is
/// invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use rust_cnns::config::load_config;
///
/// let cfg = load_config("config/xor.json").unwrap();
/// assert!(cfg.iterations > 0);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainingConfig, NetError> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks value ranges of a configuration.
pub fn validate_config(config: &TrainingConfig) -> Result<(), NetError> {
    if !(config.learning_rate >= 0.0) {
        return Err(NetError::InvalidConfig(
            "learning_rate must be non-negative".to_string(),
        ));
    }

    if !(0.0..1.0).contains(&config.momentum) {
        return Err(NetError::InvalidConfig(format!(
            "momentum must be in [0, 1), got {}",
            config.momentum
        )));
    }

    if config.iterations == 0 {
        return Err(NetError::InvalidConfig(
            "iterations must be positive".to_string(),
        ));
    }

    Ok(())
}
