//! Periodic training progress output.

use tracing::info;

use crate::training::LossHistory;

/// Observes the loss history every `epoch_freq` epochs. Never affects training.
pub trait ProgressReporter {
    /// Render the train/validation loss curves.
    fn plot_losses(&mut self, history: &LossHistory);

    /// Print the current epoch's losses.
    fn print_progress(&mut self, epoch: usize, train_loss: f64, val_loss: f64);
}

/// Reporter that writes through `tracing`.
///
/// There is no plotting backend; `plot_losses` logs a one-line summary of
/// the curves instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn plot_losses(&mut self, history: &LossHistory) {
        if let Some((best_epoch, best)) = history.best_validation() {
            info!(
                epochs = history.len(),
                best_epoch,
                best_val_loss = best,
                "Loss curves"
            );
        }
    }

    fn print_progress(&mut self, epoch: usize, train_loss: f64, val_loss: f64) {
        info!("{}", progress_line(epoch, train_loss, val_loss));
    }
}

/// `Epoch: 10,      loss train: 0.01234 loss test: 0.02345`
pub fn progress_line(epoch: usize, train_loss: f64, val_loss: f64) -> String {
    let label = format!("Epoch: {epoch},");
    format!("{label:<15} loss train: {train_loss:.5} loss test: {val_loss:.5}")
}
