//! Training infrastructure.
//!
//! - [`sag`]: stochastic average gradient updaters and the epoch loop
//! - [`TrainingLogger`]: verbosity-gated progress output

mod logger;
pub mod sag;

pub use logger::{TrainingLogger, Verbosity};
