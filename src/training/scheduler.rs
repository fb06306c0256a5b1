//! Learning-rate schedulers driven by a monitored metric.

use tracing::info;

use crate::training::Optimizer;

/// Adjusts an optimizer's learning rate once per epoch from a monitored metric.
pub trait LrScheduler {
    fn step(&mut self, optimizer: &mut dyn Optimizer, metric: f64);

    /// Learning rate after the most recent step.
    fn last_lr(&self) -> f64;
}

/// Multiply the learning rate by `factor` once the metric has failed to
/// improve (in "min" mode) for more than `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    factor: f64,
    patience: usize,
    threshold: f64,
    cooldown: usize,
    min_lr: f64,
    best: f64,
    num_bad_epochs: usize,
    cooldown_counter: usize,
    last_lr: f64,
}

impl ReduceLrOnPlateau {
    /// Defaults: factor 0.1, patience 10, relative threshold 1e-4, no cooldown.
    pub fn new(initial_lr: f64) -> Self {
        Self::with_options(initial_lr, 0.1, 10, 1e-4, 0, 0.0)
    }

    pub fn with_options(
        initial_lr: f64,
        factor: f64,
        patience: usize,
        threshold: f64,
        cooldown: usize,
        min_lr: f64,
    ) -> Self {
        Self {
            factor,
            patience,
            threshold,
            cooldown,
            min_lr,
            best: f64::INFINITY,
            num_bad_epochs: 0,
            cooldown_counter: 0,
            last_lr: initial_lr,
        }
    }

    /// Best metric seen so far.
    pub fn best(&self) -> f64 {
        self.best
    }
}

impl LrScheduler for ReduceLrOnPlateau {
    fn step(&mut self, optimizer: &mut dyn Optimizer, metric: f64) {
        if metric < self.best * (1.0 - self.threshold) {
            self.best = metric;
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
        }

        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            self.num_bad_epochs = 0;
        }

        if self.num_bad_epochs > self.patience {
            let current = optimizer.learning_rate();
            let reduced = (current * self.factor).max(self.min_lr);
            if reduced < current {
                optimizer.set_learning_rate(reduced);
                info!(from = current, to = reduced, "Reducing learning rate on plateau");
            }
            self.cooldown_counter = self.cooldown;
            self.num_bad_epochs = 0;
        }

        self.last_lr = optimizer.learning_rate();
    }

    fn last_lr(&self) -> f64 {
        self.last_lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Adam;

    #[test]
    fn test_reduces_after_patience() {
        let mut opt = Adam::new(1, 1.0);
        let mut sched = ReduceLrOnPlateau::with_options(1.0, 0.5, 2, 0.0, 0, 0.0);

        sched.step(&mut opt, 1.0); // improvement
        sched.step(&mut opt, 1.0); // bad 1
        sched.step(&mut opt, 1.0); // bad 2
        assert_eq!(opt.learning_rate(), 1.0);
        sched.step(&mut opt, 1.0); // bad 3 > patience
        assert_eq!(opt.learning_rate(), 0.5);
        assert_eq!(sched.last_lr(), 0.5);
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut opt = Adam::new(1, 1.0);
        let mut sched = ReduceLrOnPlateau::with_options(1.0, 0.5, 1, 0.0, 0, 0.0);
        for metric in [5.0, 5.0, 4.0, 4.0, 3.0] {
            sched.step(&mut opt, metric);
        }
        assert_eq!(opt.learning_rate(), 1.0);
        assert_eq!(sched.best(), 3.0);
    }

    #[test]
    fn test_respects_min_lr_and_cooldown() {
        let mut opt = Adam::new(1, 1.0);
        let mut sched = ReduceLrOnPlateau::with_options(1.0, 0.1, 0, 0.0, 1, 0.05);
        sched.step(&mut opt, 1.0); // best
        sched.step(&mut opt, 1.0); // bad -> 0.1
        assert!((opt.learning_rate() - 0.1).abs() < 1e-12);
        sched.step(&mut opt, 1.0); // cooldown
        assert!((opt.learning_rate() - 0.1).abs() < 1e-12);
        sched.step(&mut opt, 1.0); // bad -> floor 0.05
        assert!((opt.learning_rate() - 0.05).abs() < 1e-12);
    }
}
