//! Shared data structures for recurrent forecasting
//!
//! - `Window`: fixed-length `L x W` history fed to a predictor
//! - `ResultSequence` / `StepResult`: rollout trajectory in physical units
//! - `BlockSeries`: one block's true and predicted scalar series

mod series;
mod window;

pub use series::*;
pub use window::*;

use thiserror::Error;

/// One block's normalized prediction vector (length B).
pub type Prediction = Vec<f64>;

/// Ground-truth vector for the step after a window (length B, normalized).
pub type Target = Vec<f64>;

/// Invalid window construction or update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("window has no rows")]
    EmptyWindow,

    #[error("window width {0} leaves no prediction columns")]
    TooNarrow(usize),

    #[error("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("new row has width {actual}, window width is {expected}")]
    RowWidth { expected: usize, actual: usize },
}
