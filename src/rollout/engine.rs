//! The recurrent rollout loop.
//!
//! One mutable window and one last-prediction vector, advanced strictly in
//! step order. Step `i` cannot start before `prediction_{i-1}` exists.

use tracing::{debug, trace};

use crate::rollout::{Predictor, RolloutError, Unscale, WindowedSource};
use crate::types::{compose_row, Prediction, ResultSequence, ShapeError, StepResult, Target, Window};

/// Window and last prediction carried between rollout steps.
#[derive(Debug, Clone)]
pub struct RolloutState {
    window: Window,
    last_prediction: Prediction,
    step: usize,
}

impl RolloutState {
    /// Start from the source's authentic first window and its prediction.
    pub fn new(window: Window, prediction: Prediction) -> Self {
        Self {
            window,
            last_prediction: prediction,
            step: 0,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn last_prediction(&self) -> &[f64] {
        &self.last_prediction
    }

    /// Index of the step whose prediction is currently held.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Append `[last_prediction | exogenous]` as the newest row, dropping the
    /// oldest one, and return the window to feed the predictor next.
    pub fn advance(&mut self, exogenous: &[f64]) -> Result<&Window, ShapeError> {
        let row = compose_row(&self.last_prediction, exogenous);
        self.window.slide(row)?;
        Ok(&self.window)
    }

    /// Store the prediction produced for the current window.
    pub fn record(&mut self, prediction: Prediction) {
        self.last_prediction = prediction;
        self.step += 1;
    }
}

/// Run a full autoregressive rollout over `source`.
///
/// Returns one `(unscale(target_i), unscale(prediction_i))` pair per source
/// index. Step 0 runs on the source's own `window_0`; every later step runs
/// on the maintained window whose newest row carries the previous raw
/// prediction plus the exogenous columns of `window_i`'s final row.
pub fn rollout<P, S, U>(predictor: &P, source: &S, unscale: &U) -> Result<ResultSequence, RolloutError>
where
    P: Predictor + ?Sized,
    S: WindowedSource + ?Sized,
    U: Unscale + ?Sized,
{
    let steps = source.len();
    if steps == 0 {
        return Err(RolloutError::EmptySource);
    }

    let (window_0, target_0) = fetch(source, 0)?;
    let width = window_0.width();
    let num_blocks = window_0.num_blocks();
    check_target(0, &target_0, num_blocks)?;

    debug!(
        steps,
        window_len = window_0.len(),
        width,
        blocks = num_blocks,
        "Starting recurrent rollout"
    );

    let mut results = ResultSequence::with_capacity(steps);

    let prediction_0 = predict(predictor, &window_0, 0, num_blocks)?;
    results.push(StepResult {
        truth: unscale.unscale(&target_0),
        predicted: unscale.unscale(&prediction_0),
    });
    let mut state = RolloutState::new(window_0, prediction_0);

    for step in 1..steps {
        let (window, target) = fetch(source, step)?;
        if window.width() != width {
            return Err(RolloutError::shape(
                step,
                format!("source window width {} differs from {width}", window.width()),
            ));
        }
        check_target(step, &target, num_blocks)?;

        let next = state
            .advance(window.last_exogenous())
            .map_err(|e| RolloutError::shape(step, e.to_string()))?;
        let prediction = predict(predictor, next, step, num_blocks)?;

        trace!(step, prediction = ?prediction, "Rollout step");

        results.push(StepResult {
            truth: unscale.unscale(&target),
            predicted: unscale.unscale(&prediction),
        });
        state.record(prediction);
    }

    debug!(steps = results.len(), "Recurrent rollout complete");
    Ok(results)
}

fn fetch<S>(source: &S, step: usize) -> Result<(Window, Target), RolloutError>
where
    S: WindowedSource + ?Sized,
{
    source
        .get(step)
        .map_err(|e| RolloutError::collaborator(step, &e))
}

fn check_target(step: usize, target: &[f64], num_blocks: usize) -> Result<(), RolloutError> {
    if target.len() == num_blocks {
        Ok(())
    } else {
        Err(RolloutError::shape(
            step,
            format!("target has {} values, expected {num_blocks}", target.len()),
        ))
    }
}

fn predict<P>(predictor: &P, window: &Window, step: usize, num_blocks: usize) -> Result<Prediction, RolloutError>
where
    P: Predictor + ?Sized,
{
    let mut batch = predictor
        .infer(std::slice::from_ref(window))
        .map_err(|e| RolloutError::collaborator(step, &e))?;

    if batch.len() != 1 {
        return Err(RolloutError::shape(
            step,
            format!("predictor returned {} outputs for one window", batch.len()),
        ));
    }
    let prediction = batch.swap_remove(0);
    if prediction.len() != num_blocks {
        return Err(RolloutError::shape(
            step,
            format!(
                "predictor output width {} differs from {num_blocks} prediction columns",
                prediction.len()
            ),
        ));
    }
    Ok(prediction)
}
