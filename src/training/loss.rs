//! Loss criteria.

use crate::training::TrainError;
use crate::types::{Prediction, Target};

/// Scalar loss over a batch plus its gradient with respect to the predictions.
pub trait Criterion {
    fn loss(&self, predictions: &[Prediction], targets: &[Target]) -> Result<f64, TrainError>;

    fn grad(&self, predictions: &[Prediction], targets: &[Target]) -> Result<Vec<Vec<f64>>, TrainError>;
}

/// Mean squared error averaged over every element of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl Criterion for MseLoss {
    fn loss(&self, predictions: &[Prediction], targets: &[Target]) -> Result<f64, TrainError> {
        let count = element_count(predictions, targets)?;
        let sum: f64 = predictions
            .iter()
            .zip(targets)
            .flat_map(|(p, t)| p.iter().zip(t))
            .map(|(p, t)| (p - t) * (p - t))
            .sum();
        Ok(sum / count as f64)
    }

    fn grad(&self, predictions: &[Prediction], targets: &[Target]) -> Result<Vec<Vec<f64>>, TrainError> {
        let count = element_count(predictions, targets)? as f64;
        Ok(predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| p.iter().zip(t).map(|(p, t)| 2.0 * (p - t) / count).collect())
            .collect())
    }
}

/// Total element count, after checking the two batches have the same shape.
fn element_count(predictions: &[Prediction], targets: &[Target]) -> Result<usize, TrainError> {
    if predictions.len() != targets.len() {
        return Err(TrainError::ShapeMismatch(format!(
            "{} predictions for {} targets",
            predictions.len(),
            targets.len()
        )));
    }
    let mut count = 0;
    for (i, (p, t)) in predictions.iter().zip(targets).enumerate() {
        if p.len() != t.len() {
            return Err(TrainError::ShapeMismatch(format!(
                "example {i}: prediction width {} vs target width {}",
                p.len(),
                t.len()
            )));
        }
        count += p.len();
    }
    if count == 0 {
        return Err(TrainError::ShapeMismatch("empty batch".to_string()));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_value_and_grad() {
        let preds = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let targets = vec![vec![0.0, 2.0], vec![3.0, 2.0]];
        let loss = MseLoss.loss(&preds, &targets).expect("loss");
        assert!((loss - 5.0 / 4.0).abs() < 1e-12);

        let grad = MseLoss.grad(&preds, &targets).expect("grad");
        assert_eq!(grad, vec![vec![0.5, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = MseLoss.loss(&[vec![1.0]], &[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, TrainError::ShapeMismatch(_)));
        assert!(MseLoss.loss(&[], &[vec![1.0]]).is_err());
    }
}
