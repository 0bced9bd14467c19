//! Canonical representations of model state.
//!
//! - [`weights`]: coefficient matrices mutated during SAG training

pub mod weights;

pub use weights::{ScaledWeightMatrix, SimpleWeightMatrix, WeightMatrix, predict_with};
