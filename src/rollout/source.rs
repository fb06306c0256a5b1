//! In-memory windowed source, loadable from a JSON sequence dump.
//!
//! Dump layout (already windowed and normalized upstream):
//!
//! ```json
//! { "windows": [[[f64; W]; L]; N], "targets": [[f64; B]; N] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rollout::WindowedSource;
use crate::types::{Target, Window};

/// Errors while loading a sequence dump.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("sequence dump I/O error ({path}): {err}", path = .0.display(), err = .1)]
    Io(PathBuf, std::io::Error),

    #[error("sequence dump JSON error ({path}): {err}", path = .0.display(), err = .1)]
    Json(PathBuf, serde_json::Error),

    #[error("sequence dump has {windows} windows but {targets} targets")]
    LengthMismatch { windows: usize, targets: usize },
}

#[derive(Debug, Serialize, Deserialize)]
struct SequenceDump {
    windows: Vec<Window>,
    targets: Vec<Target>,
}

/// Pre-built `(window, target)` pairs held in memory.
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    pairs: Vec<(Window, Target)>,
}

impl SequenceSet {
    pub fn from_pairs(pairs: Vec<(Window, Target)>) -> Self {
        Self { pairs }
    }

    /// Pair up windows and targets index by index.
    pub fn from_parts(windows: Vec<Window>, targets: Vec<Target>) -> Result<Self, SourceError> {
        if windows.len() != targets.len() {
            return Err(SourceError::LengthMismatch {
                windows: windows.len(),
                targets: targets.len(),
            });
        }
        Ok(Self {
            pairs: windows.into_iter().zip(targets).collect(),
        })
    }

    /// Load a JSON sequence dump.
    pub fn load_json(path: &Path) -> Result<Self, SourceError> {
        let data = std::fs::read(path).map_err(|e| SourceError::Io(path.to_path_buf(), e))?;
        let dump: SequenceDump =
            serde_json::from_slice(&data).map_err(|e| SourceError::Json(path.to_path_buf(), e))?;
        let set = Self::from_parts(dump.windows, dump.targets)?;
        info!(path = %path.display(), steps = set.pairs.len(), "Loaded sequence dump");
        Ok(set)
    }

    /// Write this set as a JSON sequence dump.
    pub fn save_json(&self, path: &Path) -> Result<(), SourceError> {
        let (windows, targets): (Vec<Window>, Vec<Target>) = self.pairs.iter().cloned().unzip();
        let json = serde_json::to_vec(&SequenceDump { windows, targets })
            .map_err(|e| SourceError::Json(path.to_path_buf(), e))?;
        std::fs::write(path, json).map_err(|e| SourceError::Io(path.to_path_buf(), e))
    }

    pub fn pairs(&self) -> &[(Window, Target)] {
        &self.pairs
    }
}

impl WindowedSource for SequenceSet {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn get(&self, index: usize) -> anyhow::Result<(Window, Target)> {
        self.pairs.get(index).cloned().ok_or_else(|| {
            anyhow::anyhow!("index {index} out of range for {} steps", self.pairs.len())
        })
    }
}
