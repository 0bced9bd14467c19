//! Testing utilities for sagreg.
//!
//! Seeded data generators shared by unit tests, integration tests and
//! doc examples.
//!
//! ```
//! use sagreg::testing::synthetic_classification;
//!
//! let data = synthetic_classification(100, 20, 3, 0.8, 42);
//! assert_eq!(data.n_rows(), 100);
//! assert_eq!(data.n_features(), 21);
//! ```

mod data;

pub use data::{linear_categories, random_sparse_features, synthetic_classification};

/// Tolerance for comparing coefficients of the eager and lazy updaters.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;
