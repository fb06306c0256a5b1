//! Forecast Configuration Module
//!
//! Training, scheduling, early-stopping and rollout settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `HEAT_FORECAST_CONFIG` environment variable (path to TOML file)
//! 2. `forecast.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! Unknown keys are reported as warnings with "did you mean" suggestions;
//! out-of-range values fail validation.

mod forecast_config;
pub mod defaults;
pub mod validation;

pub use forecast_config::*;
