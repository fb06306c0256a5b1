//! Rollout outputs: per-step physical vectors and per-block scalar series.

use serde::{Deserialize, Serialize};

/// True and predicted values for one rollout step, in physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// `unscale(target_i)`.
    pub truth: Vec<f64>,
    /// `unscale(prediction_i)`.
    pub predicted: Vec<f64>,
}

/// Ordered rollout trajectory, one [`StepResult`] per source index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSequence {
    steps: Vec<StepResult>,
}

impl ResultSequence {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            steps: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Block count B, taken from the first step's truth vector (0 if empty).
    pub fn num_blocks(&self) -> usize {
        self.steps.first().map_or(0, |s| s.truth.len())
    }

    pub fn get(&self, index: usize) -> Option<&StepResult> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepResult> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[StepResult] {
        &self.steps
    }

    /// Split into parallel (truth, predicted) vector lists.
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        self.steps
            .into_iter()
            .map(|s| (s.truth, s.predicted))
            .unzip()
    }
}

impl<'a> IntoIterator for &'a ResultSequence {
    type Item = &'a StepResult;
    type IntoIter = std::slice::Iter<'a, StepResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Scalar true/predicted series for a single block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSeries {
    /// 1-based block number.
    pub block: usize,
    pub truth: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl BlockSeries {
    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }

    /// Mean absolute error between the two series (0.0 when empty).
    pub fn mae(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .truth
            .iter()
            .zip(&self.predicted)
            .map(|(t, p)| (t - p).abs())
            .sum();
        sum / self.len() as f64
    }

    /// Root mean squared error between the two series (0.0 when empty).
    pub fn rmse(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .truth
            .iter()
            .zip(&self.predicted)
            .map(|(t, p)| (t - p) * (t - p))
            .sum();
        (sum / self.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_series_errors() {
        let s = BlockSeries {
            block: 1,
            truth: vec![1.0, 2.0, 3.0, 4.0],
            predicted: vec![1.0, 3.0, 3.0, 2.0],
        };
        assert!((s.mae() - 0.75).abs() < 1e-12);
        assert!((s.rmse() - (5.0_f64 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_series_metrics() {
        let s = BlockSeries { block: 2, truth: vec![], predicted: vec![] };
        assert_eq!(s.mae(), 0.0);
        assert_eq!(s.rmse(), 0.0);
    }

    #[test]
    fn test_result_sequence_parts() {
        let mut seq = ResultSequence::with_capacity(2);
        seq.push(StepResult { truth: vec![1.0, 2.0], predicted: vec![1.5, 2.5] });
        seq.push(StepResult { truth: vec![3.0, 4.0], predicted: vec![3.5, 4.5] });
        assert_eq!(seq.num_blocks(), 2);

        let json = serde_json::to_string(&seq).expect("serialize");
        assert!(json.starts_with('['));

        let (truth, predicted) = seq.into_parts();
        assert_eq!(truth, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(predicted[1], vec![3.5, 4.5]);
    }
}
