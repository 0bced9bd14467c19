//! sagreg: stochastic average gradient training for multinomial logistic regression.
//!
//! Weights are stored per non-reference category; the last category is the
//! reference with implicit zero weights. Feature index `0` is the intercept.
//!
//! # Key Types
//!
//! - [`SagModel`] / [`SagConfig`] - High-level model with train/predict
//! - [`WeightMatrix`] - Coefficient storage ([`SimpleWeightMatrix`], [`ScaledWeightMatrix`])
//! - [`training::sag::Updater`] - Eager and lazy SAG steps
//! - [`TrainingData`] - Sparse classification rows
//!
//! # Training
//!
//! Use `SagConfig::builder()` to configure, then `SagModel::train()`.
//! See the [`model`] module for details.

// Re-export approx traits for users who want to compare coefficients
pub use approx;

pub mod data;
pub mod model;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level model types
pub use model::{ConfigError, SagConfig, SagModel};

// Coefficient storage
pub use repr::{ScaledWeightMatrix, SimpleWeightMatrix, WeightMatrix};

// Training types
pub use training::sag::{LearningRateKind, Prior, TrainError, UpdaterKind};
pub use training::Verbosity;

// Data types (for preparing training data)
pub use data::{ClassificationTrainingRow, DatasetError, SparseRow, TrainingData, TrainingRow};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
