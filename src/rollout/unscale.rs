//! Affine inverse scaling from normalized to physical units.

use serde::{Deserialize, Serialize};

use crate::rollout::Unscale;

/// `physical = normalized * scale + offset`.
///
/// For a min-max scaled series, `scale = max - min` and `offset = min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffineUnscale {
    pub scale: f64,
    pub offset: f64,
}

impl Default for AffineUnscale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl AffineUnscale {
    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Inverse of min-max normalization onto `[0, 1]`.
    pub fn from_min_max(min: f64, max: f64) -> Self {
        Self {
            scale: max - min,
            offset: min,
        }
    }
}

impl Unscale for AffineUnscale {
    fn unscale_value(&self, value: f64) -> f64 {
        value.mul_add(self.scale, self.offset)
    }
}
