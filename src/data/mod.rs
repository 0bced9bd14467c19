//! Training data abstractions.
//!
//! The updaters only see rows through the [`TrainingRow`] and
//! [`ClassificationTrainingRow`] traits, so any storage that can yield sparse
//! `(index, value)` pairs in ascending order can drive training.
//!
//! # Storage Types
//!
//! - [`SparseRow`]: owned sparse row with an implicit intercept at index 0
//! - [`TrainingData`]: a validated collection of sparse rows with dimensions

mod dataset;
mod row;

pub use dataset::{DatasetError, TrainingData};
pub use row::{ClassificationTrainingRow, INTERCEPT, SparseRow, TrainingRow};
