//! Epoch loop: train, validate, schedule, report, prune.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::rollout::{Predictor, WindowedSource};
use crate::training::{
    clip_grad_norm, Criterion, DataLoader, LogReporter, LrScheduler, Optimizer, ProgressReporter,
    Trainable, TrainError, Trial,
};

/// Per-epoch mean losses, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub train: Vec<f64>,
    pub validation: Vec<f64>,
}

impl LossHistory {
    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    pub fn last_train(&self) -> Option<f64> {
        self.train.last().copied()
    }

    pub fn last_validation(&self) -> Option<f64> {
        self.validation.last().copied()
    }

    /// `(epoch, loss)` of the lowest validation loss, epochs numbered from 1.
    pub fn best_validation(&self) -> Option<(usize, f64)> {
        self.validation
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, v)| (i + 1, v))
    }
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub num_epochs: usize,
    /// Report every `epoch_freq` epochs.
    pub epoch_freq: usize,
    pub plot_progress: bool,
    pub print_progress: bool,
    /// Clip the gradient L2 norm before each optimizer step.
    pub max_grad_norm: Option<f64>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            num_epochs: 100,
            epoch_freq: 10,
            plot_progress: false,
            print_progress: true,
            max_grad_norm: None,
        }
    }
}

impl TrainOptions {
    fn validate(&self) -> Result<(), TrainError> {
        if self.num_epochs == 0 {
            return Err(TrainError::InvalidOptions("num_epochs must be > 0".to_string()));
        }
        if self.epoch_freq == 0 {
            return Err(TrainError::InvalidOptions("epoch_freq must be > 0".to_string()));
        }
        if let Some(max) = self.max_grad_norm {
            if !(max > 0.0) {
                return Err(TrainError::InvalidOptions(format!(
                    "max_grad_norm must be > 0, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Runs the epoch loop with optional scheduler, trial and reporter hooks.
///
/// Without a reporter, periodic output goes through [`LogReporter`].
pub struct Trainer<'a> {
    options: TrainOptions,
    scheduler: Option<&'a mut dyn LrScheduler>,
    trial: Option<&'a mut dyn Trial>,
    reporter: Option<&'a mut dyn ProgressReporter>,
}

impl<'a> Trainer<'a> {
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            scheduler: None,
            trial: None,
            reporter: None,
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: &'a mut dyn LrScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn with_trial(mut self, trial: &'a mut dyn Trial) -> Self {
        self.trial = Some(trial);
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: &'a mut dyn ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Train `model` for `num_epochs` epochs.
    ///
    /// Returns the full loss history, or `TrainError::Pruned` carrying the
    /// history up to the epoch at which the trial asked to stop.
    pub fn fit<M, C, O, S, V>(
        &mut self,
        model: &mut M,
        criterion: &C,
        optimizer: &mut O,
        train: &mut DataLoader<S>,
        val: &mut DataLoader<V>,
    ) -> Result<LossHistory, TrainError>
    where
        M: Trainable,
        C: Criterion,
        O: Optimizer,
        S: WindowedSource,
        V: WindowedSource,
    {
        self.options.validate()?;
        if train.dataset_len() == 0 {
            return Err(TrainError::EmptyLoader("train"));
        }
        if val.dataset_len() == 0 {
            return Err(TrainError::EmptyLoader("validation"));
        }

        info!(
            epochs = self.options.num_epochs,
            train_examples = train.dataset_len(),
            val_examples = val.dataset_len(),
            "Starting training"
        );

        let mut history = LossHistory::default();

        for epoch in 1..=self.options.num_epochs {
            let train_loss = train_epoch(
                model,
                criterion,
                optimizer,
                train,
                self.options.max_grad_norm,
            )?;
            history.train.push(train_loss);

            let val_sum = evaluate_loss(&*model, criterion, val)?;
            if let Some(scheduler) = self.scheduler.as_deref_mut() {
                scheduler.step(optimizer, val_sum);
            }
            let val_loss = val_sum / val.dataset_len() as f64;
            history.validation.push(val_loss);

            debug!(
                epoch,
                train_loss,
                val_loss,
                lr = optimizer.learning_rate(),
                "Epoch complete"
            );

            if let Some(trial) = self.trial.as_deref_mut() {
                trial.report(val_loss, epoch);
                if trial.should_prune() {
                    warn!(epoch, val_loss, "Trial pruned, stopping training");
                    return Err(TrainError::Pruned { epoch, history });
                }
            }

            if epoch % self.options.epoch_freq == 0 {
                self.report(epoch, &history);
            }
        }

        info!(
            epochs = history.len(),
            final_train_loss = history.last_train().unwrap_or(f64::NAN),
            final_val_loss = history.last_validation().unwrap_or(f64::NAN),
            "Training complete"
        );
        Ok(history)
    }

    fn report(&mut self, epoch: usize, history: &LossHistory) {
        let (plot, print) = (self.options.plot_progress, self.options.print_progress);
        match self.reporter.as_deref_mut() {
            Some(reporter) => emit(reporter, plot, print, epoch, history),
            None => emit(&mut LogReporter, plot, print, epoch, history),
        }
    }
}

fn emit(
    reporter: &mut dyn ProgressReporter,
    plot: bool,
    print: bool,
    epoch: usize,
    history: &LossHistory,
) {
    if plot {
        reporter.plot_losses(history);
    }
    if print {
        if let (Some(train), Some(val)) = (history.last_train(), history.last_validation()) {
            reporter.print_progress(epoch, train, val);
        }
    }
}

/// One pass over `loader` with parameter updates. Returns the mean example loss.
fn train_epoch<M, C, O, S>(
    model: &mut M,
    criterion: &C,
    optimizer: &mut O,
    loader: &mut DataLoader<S>,
    max_grad_norm: Option<f64>,
) -> Result<f64, TrainError>
where
    M: Trainable,
    C: Criterion,
    O: Optimizer,
    S: WindowedSource,
{
    let mut total = 0.0;
    for batch in loader.iter() {
        let batch = batch?;
        model.zero_grad();
        let predictions = model.infer(&batch.windows)?;
        let loss = criterion.loss(&predictions, &batch.targets)?;
        let grad_output = criterion.grad(&predictions, &batch.targets)?;
        model.backward(&batch.windows, &grad_output)?;

        let (params, grads) = model.parameters();
        if let Some(max) = max_grad_norm {
            clip_grad_norm(grads, max);
        }
        optimizer.step(params, grads);

        total += loss * batch.len() as f64;
    }
    Ok(total / loader.dataset_len() as f64)
}

/// Inference-only pass over `loader`.
///
/// Returns the batch-size-weighted loss sum, not divided by the example count.
pub fn evaluate_loss<P, C, S>(
    model: &P,
    criterion: &C,
    loader: &mut DataLoader<S>,
) -> Result<f64, TrainError>
where
    P: Predictor + ?Sized,
    C: Criterion,
    S: WindowedSource,
{
    let mut total = 0.0;
    for batch in loader.iter() {
        let batch = batch?;
        let predictions = model.infer(&batch.windows)?;
        total += criterion.loss(&predictions, &batch.targets)? * batch.len() as f64;
    }
    Ok(total)
}
