//! Verbosity-gated training logger.
//!
//! Messages go through the [`log`] facade, so the host application decides
//! where they end up. [`Verbosity`] filters before anything reaches `log`.

/// Verbosity level for training output.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Warnings only (e.g. no convergence).
    Warning,
    /// Start/end summaries and one line per epoch.
    Info,
    /// Everything, including per-epoch coefficient change.
    Debug,
}

/// Logger used by the trainer to report progress.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    n_epochs: usize,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            n_epochs: 0,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Record the epoch budget and announce the run.
    pub fn start_training(&mut self, max_epochs: usize, summary: &str) {
        self.n_epochs = max_epochs;
        self.info(&format!("Starting SAG training: {max_epochs} epochs max, {summary}"));
    }

    /// Log one finished epoch.
    pub fn log_epoch(&self, epoch: usize, loss: f64, max_change: f64) {
        if self.verbosity >= Verbosity::Debug {
            log::debug!(
                "[{}/{}] loss={:.6} max_rel_change={:.3e}",
                epoch + 1,
                self.n_epochs,
                loss,
                max_change
            );
        } else if self.verbosity >= Verbosity::Info {
            log::info!("[{}/{}] loss={:.6}", epoch + 1, self.n_epochs, loss);
        }
    }

    pub fn finish_training(&self, epochs: usize, converged: bool) {
        if converged {
            self.info(&format!("Converged after {epochs} epochs"));
        } else {
            self.warn(&format!(
                "Reached {epochs} epochs without converging; consider more epochs or a larger learning rate"
            ));
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Info {
            log::info!("{message}");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            log::warn!("{message}");
        }
    }
}
