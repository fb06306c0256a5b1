//! Fixed-length feature window fed to a predictor.
//!
//! Each row is one time tick. The first `width - 2` columns carry the
//! per-block prediction features (one column per block), the last
//! [`EXOGENOUS_COLUMNS`] carry features known in advance.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::ShapeError;

/// Number of trailing exogenous columns in every window row.
pub const EXOGENOUS_COLUMNS: usize = 2;

/// An `L x W` window of feature rows, oldest row first.
///
/// Rows are stored in a ring buffer so that [`Window::slide`] is O(W).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Window {
    rows: VecDeque<Vec<f64>>,
    width: usize,
}

impl Window {
    /// Build a window from rows, oldest first.
    ///
    /// Fails if there are no rows, if rows differ in width, or if the width
    /// leaves no prediction columns next to the exogenous ones.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let width = rows.first().map(Vec::len).ok_or(ShapeError::EmptyWindow)?;
        if width <= EXOGENOUS_COLUMNS {
            return Err(ShapeError::TooNarrow(width));
        }
        if let Some((row, bad)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ShapeError::RaggedRow {
                row,
                expected: width,
                actual: bad.len(),
            });
        }
        Ok(Self {
            rows: rows.into(),
            width,
        })
    }

    /// Number of rows (L).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false: construction rejects empty windows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns per row (W).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of prediction-feature columns, i.e. the block count B.
    pub fn num_blocks(&self) -> usize {
        self.width - EXOGENOUS_COLUMNS
    }

    /// Row `index`, oldest first.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Most recent row.
    pub fn last_row(&self) -> &[f64] {
        // Non-empty by construction and `slide` never shrinks the buffer.
        self.rows.back().map_or(&[], Vec::as_slice)
    }

    /// Exogenous columns of the most recent row.
    pub fn last_exogenous(&self) -> &[f64] {
        let row = self.last_row();
        &row[row.len() - EXOGENOUS_COLUMNS..]
    }

    /// Prediction-feature columns of row `index`.
    pub fn prediction_columns(&self, index: usize) -> Option<&[f64]> {
        self.row(index).map(|r| &r[..self.num_blocks()])
    }

    /// Drop the oldest row and append `row`. The window length never changes.
    pub fn slide(&mut self, row: Vec<f64>) -> Result<(), ShapeError> {
        if row.len() != self.width {
            return Err(ShapeError::RowWidth {
                expected: self.width,
                actual: row.len(),
            });
        }
        self.rows.pop_front();
        self.rows.push_back(row);
        Ok(())
    }

    /// Row-major copy of the whole window (`L * W` values).
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.rows.len() * self.width);
        for row in &self.rows {
            flat.extend_from_slice(row);
        }
        flat
    }
}

impl TryFrom<Vec<Vec<f64>>> for Window {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Window> for Vec<Vec<f64>> {
    fn from(window: Window) -> Self {
        window.rows.into()
    }
}

/// Concatenate a block prediction with exogenous features into one window row.
pub fn compose_row(prediction: &[f64], exogenous: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(prediction.len() + exogenous.len());
    row.extend_from_slice(prediction);
    row.extend_from_slice(exogenous);
    row
}
