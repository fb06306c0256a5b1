//! Built-in default values for every config key.
//!
//! Grouped by config section.

// ============================================================================
// Training
// ============================================================================

pub const NUM_EPOCHS: usize = 100;

/// Report progress every this many epochs.
pub const EPOCH_FREQ: usize = 10;

pub const BATCH_SIZE: usize = 32;

pub const LEARNING_RATE: f64 = 1e-3;

/// Seed for weight init and loader shuffling.
pub const SEED: u64 = 42;

// ============================================================================
// Scheduler (reduce on plateau)
// ============================================================================

pub const SCHEDULER_FACTOR: f64 = 0.1;

pub const SCHEDULER_PATIENCE: usize = 10;

/// Relative improvement below which an epoch counts as a plateau.
pub const SCHEDULER_THRESHOLD: f64 = 1e-4;

// ============================================================================
// Early stopping
// ============================================================================

pub const EARLY_STOPPING_PATIENCE: usize = 10;

// ============================================================================
// Rollout
// ============================================================================

/// 1-based block reported by the `rollout` command.
pub const BLOCK_NUMBER: usize = 1;

/// Label attached to rollout reports.
pub const ROLLOUT_MODE: &str = "Validation";

/// Config file searched in the working directory when
/// `HEAT_FORECAST_CONFIG` is not set.
pub const CONFIG_FILE_NAME: &str = "forecast.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "HEAT_FORECAST_CONFIG";
