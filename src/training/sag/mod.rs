//! Stochastic average gradient (SAG) training for multinomial logistic regression.
//!
//! The building blocks are usable on their own:
//!
//! - [`Updater`]: one SAG step per row ([`EagerSagUpdater`], [`LazySagUpdater`])
//! - [`LearningRateStrategy`]: step size per row
//! - [`MultinomialLoss`]: per-row gradient against the reference category
//! - [`Prior`]: L2 shrinkage applied as a weight matrix scale
//!
//! [`SagLearner`] ties them into the epoch loop.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use sagreg::data::TrainingData;
//! use sagreg::training::sag::{SagLearner, SagParams};
//!
//! let features = array![[-1.0], [-0.5], [0.5], [1.0]];
//! let data = TrainingData::from_dense(features.view(), &[0, 0, 1, 1], 2).unwrap();
//!
//! let fit = SagLearner::new(SagParams { max_epochs: 10, ..Default::default() })
//!     .train(&data)
//!     .unwrap();
//! assert_eq!(fit.coefficients.dim(), (1, 2));
//! ```

mod learner;
mod learning_rate;
mod loss;
mod prior;
mod updater;

pub use learner::{SagFit, SagLearner, SagParams, TrainError};
pub use learning_rate::{
    AnnealingLearningRate, FixedLearningRate, LearningRate, LearningRateKind, LearningRateStrategy,
    LineSearchLearningRate,
};
pub use loss::MultinomialLoss;
pub use prior::Prior;
pub use updater::{
    EagerSagUpdater, EagerSagUpdaterFactory, LazySagUpdater, LazySagUpdaterFactory, Updater,
    UpdaterFactory, UpdaterKind,
};
