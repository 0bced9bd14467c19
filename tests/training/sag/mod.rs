//! SAG integration tests.
//!
//! - `equivalence`: lazy and eager updaters driven with identical gradients
//! - `learner`: end-to-end training through `SagModel`
//! - `properties`: weight matrix invariants under arbitrary inputs

mod equivalence;
mod learner;
mod properties;
