//! Supervised training loop with validation tracking and pruning hooks.
//!
//! Per epoch:
//!
//! ```text
//! train batches -> validate -> scheduler.step(val_sum) -> trial.report/prune -> periodic report
//! ```
//!
//! The loop is framework-agnostic: models implement [`Trainable`], and the
//! criterion, optimizer, scheduler, trial and reporter are all traits with
//! one concrete implementation each in this module.

pub mod loader;
pub mod loss;
pub mod optimizer;
pub mod report;
pub mod scheduler;
pub mod trainer;
pub mod trial;

pub use loader::{Batch, DataLoader};
pub use loss::{Criterion, MseLoss};
pub use optimizer::{clip_grad_norm, Adam, Optimizer};
pub use report::{LogReporter, ProgressReporter};
pub use scheduler::{LrScheduler, ReduceLrOnPlateau};
pub use trainer::{evaluate_loss, LossHistory, TrainOptions, Trainer};
pub use trial::{EarlyStopping, Trial};

use thiserror::Error;

use crate::rollout::Predictor;
use crate::types::Window;

/// A predictor whose parameters can be fitted by gradient descent.
pub trait Trainable: Predictor {
    /// Reset accumulated gradients to zero.
    fn zero_grad(&mut self);

    /// Accumulate parameter gradients given dLoss/dOutput for `batch`.
    fn backward(&mut self, batch: &[Window], grad_output: &[Vec<f64>]) -> anyhow::Result<()>;

    /// Flat parameter and gradient buffers, same length and layout.
    fn parameters(&mut self) -> (&mut [f64], &mut [f64]);
}

/// Training loop failures.
#[derive(Error, Debug)]
pub enum TrainError {
    /// The tuning trial asked to stop. Not a defect: carries the losses
    /// recorded up to and including `epoch`.
    #[error("trial pruned at epoch {epoch}")]
    Pruned { epoch: usize, history: LossHistory },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("{0} loader is empty")]
    EmptyLoader(&'static str),

    #[error("invalid training options: {0}")]
    InvalidOptions(String),

    #[error("collaborator failed: {0}")]
    Collaborator(String),
}

impl TrainError {
    pub fn is_pruned(&self) -> bool {
        matches!(self, Self::Pruned { .. })
    }
}

impl From<anyhow::Error> for TrainError {
    fn from(err: anyhow::Error) -> Self {
        Self::Collaborator(format!("{err:#}"))
    }
}
