//! Step size strategies for SAG.
//!
//! | Strategy | Step size |
//! |----------|-----------|
//! | [`FixedLearningRate`] | constant |
//! | [`AnnealingLearningRate`] | `initial / (1 + decay · epoch)` |
//! | [`LineSearchLearningRate`] | `1 / (L + λ)` with `L` estimated per row |
//!
//! [`LearningRateKind`] selects one of them from configuration.

use ndarray::ArrayView1;

use super::loss::MultinomialLoss;
use crate::data::{ClassificationTrainingRow, TrainingRow};

/// Supplies the step size for the next update.
///
/// Strategies receive the row, its current linear prediction and the gradient
/// about to be applied. They are free to ignore any of them.
pub trait LearningRateStrategy<R: TrainingRow> {
    fn current_learning_rate(
        &mut self,
        row: &R,
        prediction: ArrayView1<'_, f64>,
        gradient: ArrayView1<'_, f64>,
    ) -> f64;

    /// Called before the first row of every epoch.
    fn start_epoch(&mut self, _epoch: usize) {}
}

/// Constant step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLearningRate {
    rate: f64,
}

impl FixedLearningRate {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl<R: TrainingRow> LearningRateStrategy<R> for FixedLearningRate {
    #[inline]
    fn current_learning_rate(
        &mut self,
        _row: &R,
        _prediction: ArrayView1<'_, f64>,
        _gradient: ArrayView1<'_, f64>,
    ) -> f64 {
        self.rate
    }
}

/// Step size that decays once per epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingLearningRate {
    initial: f64,
    decay: f64,
    current: f64,
}

impl AnnealingLearningRate {
    pub fn new(initial: f64, decay: f64) -> Self {
        Self {
            initial,
            decay,
            current: initial,
        }
    }
}

impl<R: TrainingRow> LearningRateStrategy<R> for AnnealingLearningRate {
    #[inline]
    fn current_learning_rate(
        &mut self,
        _row: &R,
        _prediction: ArrayView1<'_, f64>,
        _gradient: ArrayView1<'_, f64>,
    ) -> f64 {
        self.current
    }

    fn start_epoch(&mut self, epoch: usize) {
        self.current = self.initial / (1.0 + self.decay * epoch as f64);
    }
}

/// Backtracking estimate of the Lipschitz constant of the row losses.
///
/// For a row with features `x`, scores `s` and gradient `g`, the estimate `L`
/// is doubled until
///
/// ```text
/// loss(s - g·‖x‖²/L) <= loss(s) - ‖g‖²·‖x‖² / (2L)
/// ```
///
/// The step is `1 / (L + λ)`. Afterwards `L` shrinks by `2^(-1/n_rows)` so the
/// estimate can recover from an overly pessimistic row. It never drops below
/// `1e-3`.
#[derive(Debug, Clone)]
pub struct LineSearchLearningRate {
    loss: MultinomialLoss,
    lipschitz: f64,
    lambda: f64,
    decay: f64,
}

impl LineSearchLearningRate {
    /// Gradients with a squared norm below this skip the search.
    const MIN_GRADIENT_NORM: f64 = 1e-8;
    const MAX_DOUBLINGS: usize = 64;
    /// Lower bound on the Lipschitz estimate, keeping `1 / L` bounded.
    const MIN_LIPSCHITZ: f64 = 1e-3;

    pub fn new(n_rows: usize, n_categories: usize, lambda: f64) -> Self {
        Self {
            loss: MultinomialLoss::new(n_categories),
            lipschitz: 1.0,
            lambda,
            decay: 2f64.powf(-1.0 / n_rows.max(1) as f64),
        }
    }

    /// Current Lipschitz estimate.
    pub fn lipschitz(&self) -> f64 {
        self.lipschitz
    }
}

impl<R: ClassificationTrainingRow> LearningRateStrategy<R> for LineSearchLearningRate {
    fn current_learning_rate(
        &mut self,
        row: &R,
        prediction: ArrayView1<'_, f64>,
        gradient: ArrayView1<'_, f64>,
    ) -> f64 {
        let grad_norm = gradient.dot(&gradient);
        if grad_norm > Self::MIN_GRADIENT_NORM {
            let category = row.category();
            let x_norm = row.squared_norm();
            let current = self.loss.loss(prediction, category);

            for _ in 0..Self::MAX_DOUBLINGS {
                let mut shifted = prediction.to_owned();
                shifted.scaled_add(-x_norm / self.lipschitz, &gradient);
                let bound = current - grad_norm * x_norm / (2.0 * self.lipschitz);
                if self.loss.loss(shifted.view(), category) <= bound {
                    break;
                }
                self.lipschitz *= 2.0;
            }
        }

        let step = 1.0 / (self.lipschitz + self.lambda);
        self.lipschitz = (self.lipschitz * self.decay).max(Self::MIN_LIPSCHITZ);
        step
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Learning rate selection for the trainer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LearningRateKind {
    Fixed(f64),
    Annealing { initial: f64, decay: f64 },
    LineSearch,
}

impl Default for LearningRateKind {
    fn default() -> Self {
        Self::Fixed(0.1)
    }
}

impl LearningRateKind {
    /// Instantiate the strategy for a dataset of the given shape.
    ///
    /// `lambda` is the per-row regularization strength of the prior.
    pub fn create(&self, n_rows: usize, n_categories: usize, lambda: f64) -> LearningRate {
        match *self {
            Self::Fixed(rate) => LearningRate::Fixed(FixedLearningRate::new(rate)),
            Self::Annealing { initial, decay } => {
                LearningRate::Annealing(AnnealingLearningRate::new(initial, decay))
            }
            Self::LineSearch => {
                LearningRate::LineSearch(LineSearchLearningRate::new(n_rows, n_categories, lambda))
            }
        }
    }
}

/// Any of the built-in strategies.
#[derive(Debug, Clone)]
pub enum LearningRate {
    Fixed(FixedLearningRate),
    Annealing(AnnealingLearningRate),
    LineSearch(LineSearchLearningRate),
}

impl<R: ClassificationTrainingRow> LearningRateStrategy<R> for LearningRate {
    fn current_learning_rate(
        &mut self,
        row: &R,
        prediction: ArrayView1<'_, f64>,
        gradient: ArrayView1<'_, f64>,
    ) -> f64 {
        match self {
            Self::Fixed(lr) => lr.current_learning_rate(row, prediction, gradient),
            Self::Annealing(lr) => lr.current_learning_rate(row, prediction, gradient),
            Self::LineSearch(lr) => lr.current_learning_rate(row, prediction, gradient),
        }
    }

    fn start_epoch(&mut self, epoch: usize) {
        match self {
            Self::Fixed(_) => {}
            Self::Annealing(lr) => LearningRateStrategy::<R>::start_epoch(lr, epoch),
            Self::LineSearch(_) => {}
        }
    }
}
