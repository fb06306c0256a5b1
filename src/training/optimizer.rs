//! Gradient-descent optimizers over flat parameter buffers.

use serde::{Deserialize, Serialize};

/// Updates a flat parameter buffer from a gradient buffer of the same layout.
pub trait Optimizer {
    fn step(&mut self, params: &mut [f64], grads: &[f64]);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/// Adam with an optional multiplicative per-step decay of the base learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    /// Base learning rate (decays over time when `decay < 1`).
    pub lr: f64,
    /// LR decay factor per step.
    pub decay: f64,
    /// Minimum learning rate floor for the decay.
    pub lr_floor: f64,
    /// Adam beta1 (first moment decay).
    pub beta1: f64,
    /// Adam beta2 (second moment decay).
    pub beta2: f64,
    /// Adam epsilon (numerical stability).
    pub eps: f64,
    /// Total steps taken.
    pub steps: u64,
    /// First moment estimates.
    m: Vec<f64>,
    /// Second moment estimates.
    v: Vec<f64>,
}

impl Adam {
    pub fn new(num_params: usize, lr: f64) -> Self {
        Self {
            lr,
            decay: 1.0,
            lr_floor: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    /// Decay the base learning rate by `decay` after every step, never below `lr_floor`.
    #[must_use]
    pub fn with_decay(mut self, decay: f64, lr_floor: f64) -> Self {
        self.decay = decay;
        self.lr_floor = lr_floor;
        self
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        if self.m.len() != params.len() {
            // Parameter layout changed: moments no longer line up
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
            self.steps = 0;
        }
        self.steps += 1;
        let t = self.steps as f64;

        // Bias-corrected LR
        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for (((w, &g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *w -= lr_t * *m / (v.sqrt() + self.eps);
        }

        self.lr = (self.lr * self.decay).max(self.lr_floor);
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

/// Scale `grads` in place so its L2 norm is at most `max_norm`. Returns the pre-clip norm.
pub fn clip_grad_norm(grads: &mut [f64], max_norm: f64) -> f64 {
    let norm = grads.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > max_norm {
        let factor = max_norm / norm;
        for g in grads.iter_mut() {
            *g *= factor;
        }
    }
    norm
}
