//! Recurrent Rollout Scenarios
//!
//! Drives `rollout` / `block_rollout` with stub predictors and hand-built
//! sources, checking the feedback splice, window sliding and every failure
//! kind.

use std::cell::{Cell, RefCell};

use anyhow::anyhow;
use heat_forecast::rollout::{block_rollout, extract_block, rollout, RolloutError};
use heat_forecast::{Prediction, Predictor, SequenceSet, Target, Window, WindowedSource};

// ============================================================================
// Fixtures
// ============================================================================

/// Returns `[k, k, ..]` on its k-th call (1-based) and records every window.
struct Counting {
    num_blocks: usize,
    calls: Cell<usize>,
    seen: RefCell<Vec<Window>>,
}

impl Counting {
    fn new(num_blocks: usize) -> Self {
        Self {
            num_blocks,
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Predictor for Counting {
    fn infer(&self, batch: &[Window]) -> anyhow::Result<Vec<Prediction>> {
        self.seen.borrow_mut().extend(batch.iter().cloned());
        Ok(batch
            .iter()
            .map(|_| {
                self.calls.set(self.calls.get() + 1);
                vec![self.calls.get() as f64; self.num_blocks]
            })
            .collect())
    }
}

/// Always returns the given number of vectors of the given width.
struct Fixed {
    outputs: usize,
    width: usize,
}

impl Predictor for Fixed {
    fn infer(&self, _batch: &[Window]) -> anyhow::Result<Vec<Prediction>> {
        Ok(vec![vec![0.0; self.width]; self.outputs])
    }
}

/// Source whose `get` fails from a given index on.
struct Failing {
    inner: SequenceSet,
    fail_from: usize,
}

impl WindowedSource for Failing {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> anyhow::Result<(Window, Target)> {
        if index >= self.fail_from {
            return Err(anyhow!("disk read failed at {index}"));
        }
        self.inner.get(index)
    }
}

fn unscale(v: f64) -> f64 {
    v * 2.0 + 1.0
}

/// Window `i` row `r` = `[100 + 10i + r, 200 + 10i + r, 1000 + 10i + r, 2000 + 10i + r]`,
/// target `i` = `[i, -i]`.
fn source(steps: usize, window_len: usize) -> SequenceSet {
    SequenceSet::from_pairs(
        (0..steps)
            .map(|i| {
                let rows = (0..window_len)
                    .map(|r| {
                        let k = (10 * i + r) as f64;
                        vec![100.0 + k, 200.0 + k, 1000.0 + k, 2000.0 + k]
                    })
                    .collect();
                let i = i as f64;
                (Window::from_rows(rows).expect("window"), vec![i, -i])
            })
            .collect(),
    )
}

fn window(rows: Vec<Vec<f64>>) -> Window {
    Window::from_rows(rows).expect("window")
}

// ============================================================================
// Concrete scenario: L=3, W=4, B=2, N=3
// ============================================================================

#[test]
fn three_step_scenario_predictions_are_unscaled_in_order() {
    let model = Counting::new(2);
    let data = source(3, 3);
    let result = rollout(&model, &data, &unscale).expect("rollout");

    assert_eq!(result.len(), 3);
    let predicted: Vec<Vec<f64>> = result.iter().map(|s| s.predicted.clone()).collect();
    assert_eq!(predicted, vec![vec![3.0, 3.0], vec![5.0, 5.0], vec![7.0, 7.0]]);

    let truth: Vec<Vec<f64>> = result.iter().map(|s| s.truth.clone()).collect();
    assert_eq!(truth, vec![vec![1.0, 1.0], vec![3.0, -1.0], vec![5.0, -3.0]]);
}

#[test]
fn three_step_scenario_windows_splice_predictions_and_exogenous() {
    let model = Counting::new(2);
    let data = source(3, 3);
    rollout(&model, &data, &unscale).expect("rollout");

    let seen = model.seen.borrow();
    assert_eq!(seen.len(), 3);

    // Step 0 runs on the authentic window_0
    assert_eq!(&seen[0], &data.pairs()[0].0);

    // Step 1: window_0 rows 1..3, then [prediction_0 | exo(window_1 last row)]
    assert_eq!(
        seen[1],
        window(vec![
            vec![101.0, 201.0, 1001.0, 2001.0],
            vec![102.0, 202.0, 1002.0, 2002.0],
            vec![1.0, 1.0, 1012.0, 2012.0],
        ])
    );

    // Step 2: the spliced rows shift up; prediction columns are raw, not unscaled
    assert_eq!(
        seen[2],
        window(vec![
            vec![102.0, 202.0, 1002.0, 2002.0],
            vec![1.0, 1.0, 1012.0, 2012.0],
            vec![2.0, 2.0, 1022.0, 2022.0],
        ])
    );
    assert_eq!(seen[2].prediction_columns(1), Some(&[1.0, 1.0][..]));
    assert_eq!(seen[2].row(2).map(|r| &r[2..]), Some(&[1022.0, 2022.0][..]));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn result_length_equals_source_length() {
    for steps in [1, 2, 7, 250] {
        let model = Counting::new(2);
        let result = rollout(&model, &source(steps, 4), &unscale).expect("rollout");
        assert_eq!(result.len(), steps);
        assert_eq!(model.calls.get(), steps);
    }
}

#[test]
fn window_length_never_changes() {
    let model = Counting::new(2);
    rollout(&model, &source(40, 5), &unscale).expect("rollout");
    assert!(model.seen.borrow().iter().all(|w| w.len() == 5 && w.width() == 4));
}

#[test]
fn later_source_prediction_columns_are_never_fed() {
    let model = Counting::new(2);
    let data = source(6, 2);
    rollout(&model, &data, &unscale).expect("rollout");

    let forbidden: Vec<f64> = data.pairs()[1..]
        .iter()
        .flat_map(|(w, _)| w.rows().flat_map(|row| row[..2].to_vec()).collect::<Vec<_>>())
        .collect();

    let seen = model.seen.borrow();
    for w in seen.iter().skip(1) {
        for r in 0..w.len() {
            let cols = w.prediction_columns(r).expect("row");
            assert!(
                cols.iter().all(|v| !forbidden.contains(v)),
                "leaked source column in {cols:?}"
            );
        }
    }
}

#[test]
fn newest_row_carries_previous_raw_prediction() {
    let model = Counting::new(2);
    rollout(&model, &source(20, 3), &unscale).expect("rollout");
    let seen = model.seen.borrow();
    for (i, w) in seen.iter().enumerate().skip(1) {
        assert_eq!(w.prediction_columns(2), Some(&[i as f64, i as f64][..]));
        let k = (10 * i + 2) as f64;
        assert_eq!(w.last_exogenous(), &[1000.0 + k, 2000.0 + k]);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn empty_source_fails() {
    let err = rollout(&Counting::new(2), &SequenceSet::default(), &unscale).unwrap_err();
    assert!(matches!(err, RolloutError::EmptySource));
}

#[test]
fn width_change_mid_sequence_fails_at_that_step() {
    let mut pairs = source(3, 2).pairs().to_vec();
    pairs[2].0 = window(vec![vec![0.0; 5], vec![0.0; 5]]);
    let err = rollout(&Counting::new(2), &SequenceSet::from_pairs(pairs), &unscale).unwrap_err();
    assert!(matches!(err, RolloutError::ShapeMismatch { step: 2, .. }), "{err}");
}

#[test]
fn wrong_target_length_fails() {
    let mut pairs = source(3, 2).pairs().to_vec();
    pairs[1].1 = vec![0.0];
    let err = rollout(&Counting::new(2), &SequenceSet::from_pairs(pairs), &unscale).unwrap_err();
    assert!(matches!(err, RolloutError::ShapeMismatch { step: 1, .. }), "{err}");
}

#[test]
fn predictor_output_shape_is_checked() {
    let data = source(2, 2);

    let narrow = Fixed { outputs: 1, width: 3 };
    let err = rollout(&narrow, &data, &unscale).unwrap_err();
    assert!(matches!(err, RolloutError::ShapeMismatch { step: 0, .. }));

    let too_many = Fixed { outputs: 2, width: 2 };
    let err = rollout(&too_many, &data, &unscale).unwrap_err();
    assert!(matches!(err, RolloutError::ShapeMismatch { step: 0, .. }));
}

#[test]
fn source_failure_is_reported_with_step() {
    let failing = Failing {
        inner: source(5, 2),
        fail_from: 3,
    };
    let err = rollout(&Counting::new(2), &failing, &unscale).unwrap_err();
    match err {
        RolloutError::Collaborator { step, message } => {
            assert_eq!(step, 3);
            assert!(message.contains("disk read failed"));
        }
        other => panic!("expected collaborator error, got {other}"),
    }
}

// ============================================================================
// Block extraction
// ============================================================================

#[test]
fn block_series_follows_block_index() {
    let model = Counting::new(2);
    let result = rollout(&model, &source(4, 3), &unscale).expect("rollout");

    let second = extract_block(&result, 2).expect("block 2");
    assert_eq!(second.block, 2);
    assert_eq!(second.truth, vec![1.0, -1.0, -3.0, -5.0]);
    assert_eq!(second.predicted, vec![3.0, 5.0, 7.0, 9.0]);
}

#[test]
fn block_number_out_of_range() {
    let result = rollout(&Counting::new(2), &source(2, 2), &unscale).expect("rollout");
    for block in [0, 3] {
        let err = extract_block(&result, block).unwrap_err();
        assert!(matches!(
            err,
            RolloutError::IndexOutOfRange { num_blocks: 2, .. }
        ));
    }
}

#[test]
fn block_rollout_checks_block_before_inference() {
    let model = Counting::new(2);
    let err = block_rollout(&model, &source(3, 2), &unscale, 5).unwrap_err();
    assert!(matches!(err, RolloutError::IndexOutOfRange { block: 5, num_blocks: 2 }));
    assert_eq!(model.calls.get(), 0);

    let series = block_rollout(&model, &source(3, 2), &unscale, 1).expect("block 1");
    assert_eq!(series.len(), 3);
    assert_eq!(series.truth, vec![1.0, 3.0, 5.0]);
}
