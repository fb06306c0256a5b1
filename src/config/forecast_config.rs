//! Forecast Configuration - training and rollout settings as TOML values
//!
//! Every section implements `Default` with the values in
//! [`defaults`](super::defaults), so a missing file or a partial file
//! behaves exactly like the built-in configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::rollout::AffineUnscale;
use crate::training::{EarlyStopping, ReduceLrOnPlateau, TrainOptions};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for training and rollout runs.
///
/// Load with `ForecastConfig::load()` which searches:
/// 1. `$HEAT_FORECAST_CONFIG` env var
/// 2. `./forecast.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Epoch loop, batching and optimizer settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Reduce-on-plateau learning-rate scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Validation-loss early stopping (acts as the pruning trial)
    #[serde(default)]
    pub early_stopping: EarlyStoppingConfig,

    /// Which block the rollout report extracts
    #[serde(default)]
    pub rollout: RolloutConfig,

    /// Normalized-to-physical conversion applied to rollout output
    #[serde(default)]
    pub unscale: AffineUnscale,
}

impl ForecastConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HEAT_FORECAST_CONFIG` environment variable
    /// 2. `./forecast.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./forecast.toml
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::CONFIG_FILE_NAME);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE_NAME);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// Parse and validate TOML text. `origin` names the source in errors.
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!(origin, "{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(origin.to_string(), e))?;
        config.validate()?;

        for w in super::validation::validate_ranges(&config) {
            warn!(origin, field = %w.field, "{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Reject values the training loop or rollout cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.training;
        let s = &self.scheduler;
        let mut errors: Vec<String> = Vec::new();

        if t.num_epochs == 0 {
            errors.push("training.num_epochs must be > 0".to_string());
        }
        if t.epoch_freq == 0 {
            errors.push("training.epoch_freq must be > 0".to_string());
        }
        if t.batch_size == 0 {
            errors.push("training.batch_size must be > 0".to_string());
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            errors.push(format!(
                "training.learning_rate ({}) must be a positive number",
                t.learning_rate
            ));
        }
        if let Some(max) = t.max_grad_norm {
            if !(max.is_finite() && max > 0.0) {
                errors.push(format!("training.max_grad_norm ({max}) must be > 0"));
            }
        }

        if !(s.factor > 0.0 && s.factor < 1.0) {
            errors.push(format!(
                "scheduler.factor ({}) must be in (0, 1)",
                s.factor
            ));
        }
        if s.threshold < 0.0 {
            errors.push(format!("scheduler.threshold ({}) must be >= 0", s.threshold));
        }
        if s.min_lr < 0.0 {
            errors.push(format!("scheduler.min_lr ({}) must be >= 0", s.min_lr));
        }

        if self.early_stopping.enabled && self.early_stopping.patience == 0 {
            errors.push("early_stopping.patience must be > 0 when enabled".to_string());
        }
        if self.early_stopping.min_delta < 0.0 {
            errors.push(format!(
                "early_stopping.min_delta ({}) must be >= 0",
                self.early_stopping.min_delta
            ));
        }

        if self.rollout.block_number == 0 {
            errors.push("rollout.block_number is 1-based and must be >= 1".to_string());
        }

        if !(self.unscale.scale.is_finite() && self.unscale.offset.is_finite()) {
            errors.push("unscale.scale and unscale.offset must be finite".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Options for [`Trainer`](crate::training::Trainer).
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            num_epochs: self.training.num_epochs,
            epoch_freq: self.training.epoch_freq,
            plot_progress: self.training.plot_progress,
            print_progress: self.training.print_progress,
            max_grad_norm: self.training.max_grad_norm,
        }
    }

    /// The configured scheduler, or `None` when disabled.
    pub fn scheduler(&self) -> Option<ReduceLrOnPlateau> {
        let s = &self.scheduler;
        s.enabled.then(|| {
            ReduceLrOnPlateau::with_options(
                self.training.learning_rate,
                s.factor,
                s.patience,
                s.threshold,
                s.cooldown,
                s.min_lr,
            )
        })
    }

    /// The configured early-stopping trial, or `None` when disabled.
    pub fn early_stopping(&self) -> Option<EarlyStopping> {
        let e = &self.early_stopping;
        e.enabled
            .then(|| EarlyStopping::new(e.patience).min_delta(e.min_delta))
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({path}): {err}", path = .0.display(), err = .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({0}): {1}")]
    Parse(String, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_num_epochs")]
    pub num_epochs: usize,

    /// Plot/print every this many epochs
    #[serde(default = "default_epoch_freq")]
    pub epoch_freq: usize,

    #[serde(default)]
    pub plot_progress: bool,

    #[serde(default = "default_true")]
    pub print_progress: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Reshuffle the training set every epoch
    #[serde(default = "default_true")]
    pub shuffle: bool,

    /// Weight init and shuffling seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Gradient L2-norm clip; unset disables clipping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grad_norm: Option<f64>,
}

fn default_num_epochs() -> usize { defaults::NUM_EPOCHS }
fn default_epoch_freq() -> usize { defaults::EPOCH_FREQ }
fn default_batch_size() -> usize { defaults::BATCH_SIZE }
fn default_seed() -> u64 { defaults::SEED }
fn default_learning_rate() -> f64 { defaults::LEARNING_RATE }
fn default_true() -> bool { true }

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: default_num_epochs(),
            epoch_freq: default_epoch_freq(),
            plot_progress: false,
            print_progress: true,
            batch_size: default_batch_size(),
            shuffle: true,
            seed: default_seed(),
            learning_rate: default_learning_rate(),
            max_grad_norm: None,
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Multiplier applied to the learning rate on a plateau
    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_scheduler_patience")]
    pub patience: usize,

    /// Relative improvement threshold
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub cooldown: usize,

    #[serde(default)]
    pub min_lr: f64,
}

fn default_factor() -> f64 { defaults::SCHEDULER_FACTOR }
fn default_scheduler_patience() -> usize { defaults::SCHEDULER_PATIENCE }
fn default_threshold() -> f64 { defaults::SCHEDULER_THRESHOLD }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: default_factor(),
            patience: default_scheduler_patience(),
            threshold: default_threshold(),
            cooldown: 0,
            min_lr: 0.0,
        }
    }
}

// ============================================================================
// Early Stopping
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_early_stopping_patience")]
    pub patience: usize,

    #[serde(default)]
    pub min_delta: f64,
}

fn default_early_stopping_patience() -> usize { defaults::EARLY_STOPPING_PATIENCE }

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            patience: default_early_stopping_patience(),
            min_delta: 0.0,
        }
    }
}

// ============================================================================
// Rollout
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// 1-based block to extract
    #[serde(default = "default_block_number")]
    pub block_number: usize,

    /// Report label, e.g. "Validation" or "Test"
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_block_number() -> usize { defaults::BLOCK_NUMBER }
fn default_mode() -> String { defaults::ROLLOUT_MODE.to_string() }

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            block_number: default_block_number(),
            mode: default_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.training.num_epochs, defaults::NUM_EPOCHS);
        assert_eq!(config.rollout.mode, "Validation");
        assert!(config.scheduler().is_some());
        assert!(config.early_stopping().is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = ForecastConfig::from_toml_str(
            r#"
[training]
num_epochs = 5

[early_stopping]
enabled = true
patience = 2
"#,
            "inline",
        )
        .expect("parse");
        assert_eq!(config.training.num_epochs, 5);
        assert_eq!(config.training.epoch_freq, defaults::EPOCH_FREQ);
        assert_eq!(config.unscale, AffineUnscale::default());
        assert!(config.early_stopping().is_some());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = ForecastConfig::default();
        config.training.max_grad_norm = Some(1.0);
        config.unscale = AffineUnscale::new(30.0, 5.0);
        let text = config.to_toml().expect("serialize");
        let parsed = ForecastConfig::from_toml_str(&text, "inline").expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_collected() {
        let mut config = ForecastConfig::default();
        config.training.num_epochs = 0;
        config.rollout.block_number = 0;
        config.scheduler.factor = 1.5;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_train_options_follow_config() {
        let mut config = ForecastConfig::default();
        config.training.epoch_freq = 3;
        config.training.plot_progress = true;
        let opts = config.train_options();
        assert_eq!(opts.epoch_freq, 3);
        assert!(opts.plot_progress);
        assert_eq!(opts.num_epochs, defaults::NUM_EPOCHS);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("forecast.toml");
        let mut config = ForecastConfig::default();
        config.rollout.block_number = 3;
        config.save_to_file(&path).expect("save");
        let loaded = ForecastConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded.rollout.block_number, 3);
    }
}
