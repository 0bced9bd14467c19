//! High-level model wrapper.
//!
//! - [`SagConfig`]: validated training configuration
//! - [`SagModel`]: trained coefficients with prediction and serialization
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use sagreg::model::{SagConfig, SagModel};
//! use sagreg::training::sag::Prior;
//!
//! let features = array![[-1.0, 0.0], [-0.5, 1.0], [0.5, 0.0], [1.0, 1.0]];
//! let config = SagConfig::builder()
//!     .max_epochs(20)
//!     .prior(Prior::gauss(10.0))
//!     .build()
//!     .unwrap();
//!
//! let model = SagModel::train_dense(features.view(), &[0, 0, 1, 1], 2, &config).unwrap();
//! assert_eq!(model.coefficients().dim(), (1, 3));
//! ```

mod config;
mod sag;

pub use config::{ConfigError, SagConfig};
pub use sag::SagModel;
