//! heat-forecast: recurrent rollout evaluation and supervised training for
//! block temperature forecasting.
//!
//! ## Architecture
//!
//! - **Rollout**: free-running multi-step forecast that feeds a predictor
//!   its own previous outputs ([`rollout`](rollout::rollout))
//! - **Training**: epoch loop with validation, LR scheduling and pruning
//!   hooks ([`Trainer`])
//! - **Model**: linear baseline predictor and JSON checkpoints
//! - **Config**: TOML settings with typo detection

pub mod config;
pub mod model;
pub mod rollout;
pub mod training;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ForecastConfig};

// Re-export core data types
pub use types::{BlockSeries, Prediction, ResultSequence, ShapeError, StepResult, Target, Window};

// Re-export rollout engine and collaborator traits
pub use rollout::{
    block_rollout, extract_block, AffineUnscale, Predictor, RolloutError, SequenceSet, Unscale,
    WindowedSource,
};

// Re-export training loop
pub use training::{
    DataLoader, LossHistory, ProgressReporter, TrainError, TrainOptions, Trainable, Trainer, Trial,
};

// Re-export model
pub use model::{LinearWindowModel, ModelCheckpoint};
