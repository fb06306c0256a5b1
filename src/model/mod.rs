//! Reference predictor and its on-disk checkpoint format.
//!
//! The rollout and training loop only see the [`Predictor`](crate::rollout::Predictor)
//! and [`Trainable`](crate::training::Trainable) traits; `LinearWindowModel`
//! is the baseline the CLI trains and evaluates.

pub mod checkpoint;
pub mod linear;

pub use checkpoint::{CheckpointError, CheckpointMetadata, ModelCheckpoint, CHECKPOINT_VERSION};
pub use linear::LinearWindowModel;
