//! Model checkpoints: JSON snapshot of a trained model plus provenance.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::LinearWindowModel;
use crate::training::LossHistory;

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("incompatible checkpoint: {0}")]
    Incompatible(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    /// Format version for forward compatibility.
    pub version: u32,
    pub model: LinearWindowModel,
    pub metadata: CheckpointMetadata,
}

/// Provenance for a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub created_at: DateTime<Utc>,
    pub epochs_trained: usize,
    /// Mean train loss of the last epoch.
    pub final_train_loss: Option<f64>,
    pub final_val_loss: Option<f64>,
}

impl ModelCheckpoint {
    /// Snapshot `model` with the losses recorded while training it.
    pub fn new(model: LinearWindowModel, history: &LossHistory) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            model,
            metadata: CheckpointMetadata {
                created_at: Utc::now(),
                epochs_trained: history.len(),
                final_train_loss: history.last_train(),
                final_val_loss: history.last_validation(),
            },
        }
    }

    /// Fail unless the checkpoint's model accepts `window_len x width` windows.
    pub fn check_compatible(&self, window_len: usize, width: usize) -> Result<(), CheckpointError> {
        if self.model.window_len() != window_len || self.model.width() != width {
            return Err(CheckpointError::Incompatible(format!(
                "model expects {}x{} windows, data has {window_len}x{width}",
                self.model.window_len(),
                self.model.width(),
            )));
        }
        Ok(())
    }

    /// Save to disk atomically (write temp file, then rename).
    pub fn save_to_disk(&self, path: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(self)?;
        let io_err = |source: io::Error| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        };

        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;

        info!(path = %path.display(), epochs = self.metadata.epochs_trained, "Checkpoint saved");
        Ok(())
    }

    pub fn load_from_disk(path: &Path) -> Result<Self, CheckpointError> {
        let data = std::fs::read(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cp: Self = serde_json::from_slice(&data)?;
        if cp.version > CHECKPOINT_VERSION {
            return Err(CheckpointError::Incompatible(format!(
                "checkpoint version {} is newer than supported version {CHECKPOINT_VERSION}",
                cp.version
            )));
        }
        Ok(cp)
    }
}
