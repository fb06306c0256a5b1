//! Recurrent (autoregressive) rollout over a windowed sequence source.
//!
//! The engine feeds a predictor its own previous output instead of the
//! recorded history, producing a free-running multi-step forecast:
//!
//! ```text
//! step 0:   window_0 (as supplied)             -> prediction_0
//! step i:   slide(window, [prediction_{i-1} | exo(window_i)]) -> prediction_i
//! ```
//!
//! Only the exogenous columns of each later source window are used; its
//! prediction columns are discarded. Outputs are unscaled to physical
//! units at the boundary, the recurrence itself stays in normalized units.
//!
//! ## Collaborators
//!
//! - [`WindowedSource`]: indexed `(window, target)` pairs
//! - [`Predictor`]: batch of windows -> batch of block predictions
//! - [`Unscale`]: normalized -> physical units

pub mod block;
pub mod engine;
pub mod source;
pub mod unscale;

pub use block::{block_rollout, extract_block};
pub use engine::{rollout, RolloutState};
pub use source::{SequenceSet, SourceError};
pub use unscale::AffineUnscale;

use thiserror::Error;

use crate::types::{Prediction, Target, Window};

// ============================================================================
// Collaborator traits
// ============================================================================

/// Indexed source of `(window, target)` pairs.
///
/// `get(i)` must succeed for every `i < len()`.
pub trait WindowedSource {
    /// Number of steps N.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window ending just before step `index`, and the normalized target for it.
    fn get(&self, index: usize) -> anyhow::Result<(Window, Target)>;
}

/// Maps a batch of windows to one normalized prediction vector per window.
///
/// Takes `&self`: inference never mutates model parameters.
pub trait Predictor {
    fn infer(&self, batch: &[Window]) -> anyhow::Result<Vec<Prediction>>;
}

/// Converts normalized values back to physical units. Must be pure.
pub trait Unscale {
    fn unscale_value(&self, value: f64) -> f64;

    fn unscale(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.unscale_value(v)).collect()
    }
}

impl<F> Unscale for F
where
    F: Fn(f64) -> f64,
{
    fn unscale_value(&self, value: f64) -> f64 {
        self(value)
    }
}

impl<S: WindowedSource + ?Sized> WindowedSource for &S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> anyhow::Result<(Window, Target)> {
        (**self).get(index)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Rollout and block extraction failures.
///
/// All of these are configuration/programming errors: no partial result is
/// ever returned, since every later step depends on the earlier ones.
#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("empty source: a rollout needs at least one step")]
    EmptySource,

    #[error("shape mismatch at step {step}: {detail}")]
    ShapeMismatch { step: usize, detail: String },

    #[error("block number {block} out of range 1..={num_blocks}")]
    IndexOutOfRange { block: usize, num_blocks: usize },

    #[error("collaborator failed at step {step}: {message}")]
    Collaborator { step: usize, message: String },
}

impl RolloutError {
    pub(crate) fn shape(step: usize, detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            step,
            detail: detail.into(),
        }
    }

    pub(crate) fn collaborator(step: usize, err: &anyhow::Error) -> Self {
        Self::Collaborator {
            step,
            message: format!("{err:#}"),
        }
    }
}
