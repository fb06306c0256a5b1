//! Hyperparameter-search trial hooks.

use tracing::debug;

/// Receives per-epoch validation losses and decides whether to abort the run.
pub trait Trial {
    fn report(&mut self, value: f64, epoch: usize);

    fn should_prune(&self) -> bool;
}

/// Prune once the reported value has not improved by more than `min_delta`
/// for `patience` consecutive reports.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: f64,
    counter: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            min_delta: 0.0,
            best: f64::INFINITY,
            counter: 0,
        }
    }

    #[must_use]
    pub fn min_delta(mut self, delta: f64) -> Self {
        self.min_delta = delta;
        self
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

impl Trial for EarlyStopping {
    fn report(&mut self, value: f64, epoch: usize) {
        if value < self.best - self.min_delta {
            self.best = value;
            self.counter = 0;
        } else {
            self.counter += 1;
            debug!(epoch, value, best = self.best, stale = self.counter, "No improvement");
        }
    }

    fn should_prune(&self) -> bool {
        self.counter >= self.patience
    }
}
