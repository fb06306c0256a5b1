//! Linear map from a flattened window to one value per block.
//!
//! ```text
//! x = flatten(window)              // L * W inputs, row-major
//! y[b] = sum_j W[b][j] * x[j] + bias[b]
//! ```

use anyhow::{bail, ensure, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rollout::Predictor;
use crate::training::Trainable;
use crate::types::{Prediction, Window, EXOGENOUS_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWindowModel {
    window_len: usize,
    width: usize,
    num_blocks: usize,
    /// Weights `[num_blocks x inputs]` row-major, then `num_blocks` biases.
    params: Vec<f64>,
    #[serde(skip)]
    grads: Vec<f64>,
}

impl LinearWindowModel {
    /// Random init with `N(0, 1/inputs)` weights and zero biases.
    pub fn new(window_len: usize, width: usize, seed: u64) -> Result<Self> {
        ensure!(window_len > 0, "window_len must be > 0");
        ensure!(
            width > EXOGENOUS_COLUMNS,
            "width {width} leaves no prediction columns"
        );
        let num_blocks = width - EXOGENOUS_COLUMNS;
        let inputs = window_len * width;

        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, (1.0 / inputs as f64).sqrt())?;
        let mut params: Vec<f64> = (0..num_blocks * inputs)
            .map(|_| normal.sample(&mut rng))
            .collect();
        params.extend(std::iter::repeat(0.0).take(num_blocks));

        Ok(Self {
            window_len,
            width,
            num_blocks,
            grads: vec![0.0; params.len()],
            params,
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    fn inputs(&self) -> usize {
        self.window_len * self.width
    }

    fn check_window(&self, window: &Window) -> Result<()> {
        if window.len() != self.window_len || window.width() != self.width {
            bail!(
                "window is {}x{}, model expects {}x{}",
                window.len(),
                window.width(),
                self.window_len,
                self.width
            );
        }
        Ok(())
    }

    fn forward(&self, window: &Window) -> Result<Prediction> {
        self.check_window(window)?;
        let x = window.to_flat();
        let inputs = self.inputs();
        let (weights, bias) = self.params.split_at(self.num_blocks * inputs);
        Ok(weights
            .chunks_exact(inputs)
            .zip(bias)
            .map(|(row, b)| row.iter().zip(&x).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect())
    }
}

impl Predictor for LinearWindowModel {
    fn infer(&self, batch: &[Window]) -> Result<Vec<Prediction>> {
        batch.par_iter().map(|w| self.forward(w)).collect()
    }
}

impl Trainable for LinearWindowModel {
    fn zero_grad(&mut self) {
        self.grads.clear();
        self.grads.resize(self.params.len(), 0.0);
    }

    fn backward(&mut self, batch: &[Window], grad_output: &[Vec<f64>]) -> Result<()> {
        ensure!(
            batch.len() == grad_output.len(),
            "{} windows for {} output gradients",
            batch.len(),
            grad_output.len()
        );
        if self.grads.len() != self.params.len() {
            self.zero_grad();
        }
        let inputs = self.inputs();
        let weight_len = self.num_blocks * inputs;

        for (window, g) in batch.iter().zip(grad_output) {
            self.check_window(window)?;
            ensure!(
                g.len() == self.num_blocks,
                "output gradient has {} entries, model has {} blocks",
                g.len(),
                self.num_blocks
            );
            let x = window.to_flat();
            let (gw, gb) = self.grads.split_at_mut(weight_len);
            for ((row, bias), &go) in gw.chunks_exact_mut(inputs).zip(gb.iter_mut()).zip(g) {
                for (gwj, xj) in row.iter_mut().zip(&x) {
                    *gwj += go * xj;
                }
                *bias += go;
            }
        }
        Ok(())
    }

    fn parameters(&mut self) -> (&mut [f64], &mut [f64]) {
        if self.grads.len() != self.params.len() {
            self.zero_grad();
        }
        (&mut self.params, &mut self.grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(rows: &[[f64; 3]]) -> Window {
        Window::from_rows(rows.iter().map(|r| r.to_vec()).collect()).expect("window")
    }

    #[test]
    fn test_shapes() {
        let model = LinearWindowModel::new(2, 3, 1).expect("model");
        assert_eq!(model.num_blocks(), 1);
        assert_eq!(model.num_params(), 2 * 3 + 1);

        let out = model
            .infer(&[window(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])])
            .expect("infer");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1);
    }

    #[test]
    fn test_rejects_wrong_window() {
        let model = LinearWindowModel::new(2, 3, 1).expect("model");
        assert!(model.infer(&[window(&[[1.0, 0.0, 0.0]])]).is_err());
        assert!(LinearWindowModel::new(2, 2, 1).is_err());
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = LinearWindowModel::new(3, 4, 9).expect("model");
        let b = LinearWindowModel::new(3, 4, 9).expect("model");
        assert_eq!(a.params, b.params);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut model = LinearWindowModel::new(1, 3, 3).expect("model");
        let batch = vec![window(&[[0.5, -1.0, 2.0]])];
        let target = 1.0;

        // d/dp of 0.5 * (y - t)^2 is (y - t) * dy/dp
        let y = model.infer(&batch).expect("infer")[0][0];
        model.zero_grad();
        model.backward(&batch, &[vec![y - target]]).expect("backward");
        let analytic = model.grads.clone();

        let eps = 1e-6;
        for i in 0..model.num_params() {
            model.params[i] += eps;
            let up = model.infer(&batch).expect("infer")[0][0];
            model.params[i] -= 2.0 * eps;
            let down = model.infer(&batch).expect("infer")[0][0];
            model.params[i] += eps;
            let numeric = (0.5 * (up - target).powi(2) - 0.5 * (down - target).powi(2)) / (2.0 * eps);
            assert!((numeric - analytic[i]).abs() < 1e-5, "param {i}");
        }
    }

    #[test]
    fn test_grads_restored_after_deserialize() {
        let model = LinearWindowModel::new(1, 3, 3).expect("model");
        let json = serde_json::to_string(&model).expect("serialize");
        let mut restored: LinearWindowModel = serde_json::from_str(&json).expect("deserialize");
        let (params, grads) = restored.parameters();
        assert_eq!(params.len(), grads.len());
    }
}
