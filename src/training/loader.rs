//! Mini-batch loader over any windowed source.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::rollout::WindowedSource;
use crate::training::TrainError;
use crate::types::{Target, Window};

/// One mini-batch of windows and their targets.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub windows: Vec<Window>,
    pub targets: Vec<Target>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Fixed-size batches over a [`WindowedSource`], optionally reshuffled every pass.
#[derive(Debug)]
pub struct DataLoader<S> {
    source: S,
    batch_size: usize,
    rng: Option<StdRng>,
}

impl<S: WindowedSource> DataLoader<S> {
    pub fn new(source: S, batch_size: usize) -> Result<Self, TrainError> {
        if batch_size == 0 {
            return Err(TrainError::InvalidOptions("batch_size must be > 0".to_string()));
        }
        Ok(Self {
            source,
            batch_size,
            rng: None,
        })
    }

    /// Shuffle the example order on every pass, deterministically from `seed`.
    #[must_use]
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Number of examples in the underlying source.
    pub fn dataset_len(&self) -> usize {
        self.source.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per pass (last one may be partial).
    pub fn num_batches(&self) -> usize {
        self.dataset_len().div_ceil(self.batch_size)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Start one pass over the data.
    pub fn iter(&mut self) -> Batches<'_, S> {
        let mut order: Vec<usize> = (0..self.source.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }
        Batches {
            source: &self.source,
            order,
            batch_size: self.batch_size,
            pos: 0,
        }
    }
}

/// Iterator over one pass of a [`DataLoader`].
pub struct Batches<'a, S> {
    source: &'a S,
    order: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl<S: WindowedSource> Iterator for Batches<'_, S> {
    type Item = anyhow::Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        self.pos = end;

        let mut batch = Batch {
            windows: Vec::with_capacity(indices.len()),
            targets: Vec::with_capacity(indices.len()),
        };
        for &i in indices {
            match self.source.get(i) {
                Ok((window, target)) => {
                    batch.windows.push(window);
                    batch.targets.push(target);
                }
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(batch))
    }
}
