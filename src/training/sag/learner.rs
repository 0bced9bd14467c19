//! Epoch loop for SAG training of multinomial logistic regression.
//!
//! Each epoch visits every row once in a shuffled order. Per row, at global
//! iteration `t`:
//!
//! ```text
//! lazy_update → predict → gradient → learning rate → scale(1 - step·λ) → update
//! ```
//!
//! After the last row the updater is flushed so the coefficients can be read,
//! the regularized mean loss is recorded and convergence is checked on the
//! relative change of the coefficients.

use ndarray::{Array2, ArrayView2, Zip};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::learning_rate::{LearningRateKind, LearningRateStrategy};
use super::loss::MultinomialLoss;
use super::prior::Prior;
use super::updater::{
    EagerSagUpdaterFactory, LazySagUpdaterFactory, Updater, UpdaterFactory, UpdaterKind,
};
use crate::data::{ClassificationTrainingRow, DatasetError, SparseRow, TrainingData};
use crate::repr::{ScaledWeightMatrix, SimpleWeightMatrix, WeightMatrix, predict_with};
use crate::training::{TrainingLogger, Verbosity};
use crate::utils::Parallelism;

/// Scale register value below which the lazy system is flushed mid-epoch.
const MIN_SCALE: f64 = 1e-9;

/// Errors raised while training.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainError {
    /// The learning rate and prior produced a step that cannot be applied.
    #[error(
        "invalid step size {step} at iteration {iteration}: the step must be finite and positive \
         and the prior shrink factor positive"
    )]
    InvalidStepSize { step: f64, iteration: usize },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

// ============================================================================
// SagParams
// ============================================================================

/// Parameters for SAG training.
///
/// Use struct construction with `..Default::default()`:
///
/// ```
/// use sagreg::training::sag::{LearningRateKind, Prior, SagParams};
///
/// let params = SagParams {
///     max_epochs: 50,
///     learning_rate: LearningRateKind::LineSearch,
///     prior: Prior::gauss(10.0),
///     ..Default::default()
/// };
/// assert!(params.fit_intercept);
/// ```
#[derive(Clone, Debug)]
pub struct SagParams {
    /// Maximum number of passes over the data.
    pub max_epochs: usize,

    /// Stop when the relative coefficient change of an epoch falls below this.
    pub epsilon: f64,

    /// Eager or lazy application of the averaged step.
    pub updater: UpdaterKind,

    pub learning_rate: LearningRateKind,

    pub prior: Prior,

    pub fit_intercept: bool,

    /// Seed for the per-epoch row shuffle.
    pub seed: u64,

    pub verbosity: Verbosity,

    /// Whether the per-epoch loss may be evaluated in parallel.
    pub parallelism: Parallelism,
}

impl Default for SagParams {
    fn default() -> Self {
        Self {
            max_epochs: 100,
            epsilon: 1e-5,
            updater: UpdaterKind::default(),
            learning_rate: LearningRateKind::default(),
            prior: Prior::default(),
            fit_intercept: true,
            seed: 42,
            verbosity: Verbosity::default(),
            parallelism: Parallelism::default(),
        }
    }
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct SagFit {
    /// Effective coefficients `[n_categories - 1, n_features]`.
    pub coefficients: Array2<f64>,
    pub n_epochs: usize,
    pub converged: bool,
    /// Regularized mean loss after every epoch.
    pub loss_history: Vec<f64>,
}

// ============================================================================
// SagLearner
// ============================================================================

/// Stochastic average gradient trainer.
#[derive(Clone, Debug, Default)]
pub struct SagLearner {
    params: SagParams,
}

impl SagLearner {
    pub fn new(params: SagParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SagParams {
        &self.params
    }

    /// Train on `data`.
    ///
    /// The lazy updater runs on a [`ScaledWeightMatrix`] so the prior's shrink
    /// is O(1) per step; the eager updater runs on a [`SimpleWeightMatrix`].
    pub fn train(&self, data: &TrainingData) -> Result<SagFit, TrainError> {
        let (n_rows, n_features, n_categories) =
            (data.n_rows(), data.n_features(), data.n_categories());
        let fit_intercept = self.params.fit_intercept;

        match self.params.updater {
            UpdaterKind::Eager => self.train_with(
                data,
                EagerSagUpdaterFactory::new(n_rows, n_features, n_categories),
                SimpleWeightMatrix::zeros(n_features, n_categories, fit_intercept),
            ),
            UpdaterKind::Lazy => self.train_with(
                data,
                LazySagUpdaterFactory::new(n_rows, n_features, n_categories),
                ScaledWeightMatrix::zeros(n_features, n_categories, fit_intercept),
            ),
        }
    }

    fn train_with<F, W>(
        &self,
        data: &TrainingData,
        factory: F,
        mut beta: W,
    ) -> Result<SagFit, TrainError>
    where
        F: UpdaterFactory<SparseRow>,
        W: WeightMatrix,
    {
        let params = &self.params;
        let n_rows = data.n_rows();
        let loss = MultinomialLoss::new(data.n_categories());
        let lambda = params.prior.lambda(n_rows);

        let mut learning_rate = params
            .learning_rate
            .create(n_rows, data.n_categories(), lambda);
        let mut updater = factory.create();
        let mut last_visited = vec![0usize; data.n_features()];
        let mut order: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut logger = TrainingLogger::new(params.verbosity);
        logger.start_training(
            params.max_epochs,
            &format!(
                "{} rows, {} features, {} categories, {:?} updater",
                n_rows,
                data.n_features() - 1,
                data.n_categories(),
                params.updater
            ),
        );

        let mut previous = beta.weights();
        let mut loss_history = Vec::with_capacity(params.max_epochs);
        let mut converged = false;
        let mut iteration = 0usize;

        for epoch in 0..params.max_epochs {
            LearningRateStrategy::<SparseRow>::start_epoch(&mut learning_rate, epoch);
            order.shuffle(&mut rng);

            for &index in &order {
                let row = data.row(index);
                // Pending steps must be replayed before the register underflows.
                if beta.scale_factor() < MIN_SCALE {
                    updater.reset_jit_system(&mut beta, &mut last_visited);
                }
                updater.lazy_update(&mut beta, row, &mut last_visited, iteration);

                let prediction = beta.predict(row);
                let gradient = loss.gradient(prediction.view(), row.category());
                let step =
                    learning_rate.current_learning_rate(row, prediction.view(), gradient.view());
                let shrink = params.prior.shrink(step, n_rows);
                if !step.is_finite() || step <= 0.0 || shrink <= 0.0 {
                    return Err(TrainError::InvalidStepSize { step, iteration });
                }
                if shrink != 1.0 {
                    beta.scale(shrink);
                }

                updater.update(row, gradient.view(), &mut beta, step, iteration);
                iteration += 1;
            }

            updater.reset_jit_system(&mut beta, &mut last_visited);

            let current = beta.weights();
            let epoch_loss = self.objective(data, &loss, current.view());
            let change = max_relative_change(previous.view(), current.view());
            logger.log_epoch(epoch, epoch_loss, change);
            loss_history.push(epoch_loss);
            previous = current;

            if change < params.epsilon {
                converged = true;
                break;
            }
        }

        let n_epochs = loss_history.len();
        logger.finish_training(n_epochs, converged);

        Ok(SagFit {
            coefficients: previous,
            n_epochs,
            converged,
            loss_history,
        })
    }

    /// Mean row loss plus the prior's penalty.
    fn objective(
        &self,
        data: &TrainingData,
        loss: &MultinomialLoss,
        weights: ArrayView2<'_, f64>,
    ) -> f64 {
        let fit_intercept = self.params.fit_intercept;
        let total = self.params.parallelism.maybe_par_sum(data.rows(), |row| {
            let prediction = predict_with(weights, fit_intercept, row);
            loss.loss(prediction.view(), row.category())
        });
        total / data.n_rows() as f64 + self.params.prior.penalty(weights, data.n_rows())
    }
}

/// `max |new - old| / max(max |old|, 1e-10)`.
fn max_relative_change(old: ArrayView2<'_, f64>, new: ArrayView2<'_, f64>) -> f64 {
    let mut max_change = 0.0f64;
    let mut max_old = 0.0f64;
    Zip::from(&old).and(&new).for_each(|&o, &n| {
        max_change = max_change.max((n - o).abs());
        max_old = max_old.max(o.abs());
    });
    max_change / max_old.max(1e-10)
}
