//! Projection of a rollout trajectory onto a single block.

use crate::rollout::{rollout, Predictor, RolloutError, Unscale, WindowedSource};
use crate::types::{BlockSeries, ResultSequence};

/// Extract the true and predicted scalar series of 1-based `block`.
pub fn extract_block(result: &ResultSequence, block: usize) -> Result<BlockSeries, RolloutError> {
    let num_blocks = result.num_blocks();
    check_block(block, num_blocks)?;

    let index = block - 1;
    let mut truth = Vec::with_capacity(result.len());
    let mut predicted = Vec::with_capacity(result.len());
    for (step, s) in result.iter().enumerate() {
        match (s.truth.get(index), s.predicted.get(index)) {
            (Some(&t), Some(&p)) => {
                truth.push(t);
                predicted.push(p);
            }
            _ => {
                return Err(RolloutError::shape(
                    step,
                    format!(
                        "step holds {} true / {} predicted values, block {block} requested",
                        s.truth.len(),
                        s.predicted.len()
                    ),
                ))
            }
        }
    }

    Ok(BlockSeries {
        block,
        truth,
        predicted,
    })
}

/// Run a rollout and return the series of one block.
///
/// The block number is checked against the source's first window before any
/// inference runs.
pub fn block_rollout<P, S, U>(
    predictor: &P,
    source: &S,
    unscale: &U,
    block: usize,
) -> Result<BlockSeries, RolloutError>
where
    P: Predictor + ?Sized,
    S: WindowedSource + ?Sized,
    U: Unscale + ?Sized,
{
    if source.is_empty() {
        return Err(RolloutError::EmptySource);
    }
    let (window_0, _) = source
        .get(0)
        .map_err(|e| RolloutError::collaborator(0, &e))?;
    check_block(block, window_0.num_blocks())?;

    let result = rollout(predictor, source, unscale)?;
    extract_block(&result, block)
}

fn check_block(block: usize, num_blocks: usize) -> Result<(), RolloutError> {
    if (1..=num_blocks).contains(&block) {
        Ok(())
    } else {
        Err(RolloutError::IndexOutOfRange { block, num_blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepResult;

    fn three_steps() -> ResultSequence {
        let mut seq = ResultSequence::default();
        for i in 0..3 {
            let base = f64::from(i) * 10.0;
            seq.push(StepResult {
                truth: vec![base + 1.0, base + 2.0],
                predicted: vec![base + 1.5, base + 2.5],
            });
        }
        seq
    }

    #[test]
    fn test_extract_second_block() {
        let series = extract_block(&three_steps(), 2).expect("block 2");
        assert_eq!(series.block, 2);
        assert_eq!(series.truth, vec![2.0, 12.0, 22.0]);
        assert_eq!(series.predicted, vec![2.5, 12.5, 22.5]);
    }

    #[test]
    fn test_block_bounds() {
        let seq = three_steps();
        for block in [0, 3, 100] {
            match extract_block(&seq, block) {
                Err(RolloutError::IndexOutOfRange { block: b, num_blocks }) => {
                    assert_eq!(b, block);
                    assert_eq!(num_blocks, 2);
                }
                other => panic!("expected IndexOutOfRange, got {other:?}"),
            }
        }
    }
}
