//! Trained multinomial logistic regression model.

use std::io::{Read, Write};

use ndarray::{Array1, Array2, ArrayView2};

use crate::data::{TrainingData, TrainingRow};
use crate::repr::predict_with;
use crate::training::sag::{MultinomialLoss, SagLearner, TrainError};
use crate::utils::run_with_threads;

use super::SagConfig;

/// Multinomial logistic regression model trained with SAG.
///
/// Stores one coefficient row per non-reference category; column 0 is the
/// intercept and user feature `i` is column `i + 1`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SagModel {
    coefficients: Array2<f64>,
    fit_intercept: bool,
    n_epochs: usize,
    converged: bool,
    loss_history: Vec<f64>,
}

impl SagModel {
    /// Train a new model.
    ///
    /// Loss evaluation runs on a pool of `config.n_threads` threads; the
    /// updates themselves are sequential.
    pub fn train(data: &TrainingData, config: &SagConfig) -> Result<Self, TrainError> {
        let fit = run_with_threads(config.n_threads, |parallelism| {
            SagLearner::new(config.to_trainer_params(parallelism)).train(data)
        })?;

        Ok(Self {
            coefficients: fit.coefficients,
            fit_intercept: config.fit_intercept,
            n_epochs: fit.n_epochs,
            converged: fit.converged,
            loss_history: fit.loss_history,
        })
    }

    /// Train from a dense sample-major matrix `[n_rows, n_user_features]`.
    pub fn train_dense(
        features: ArrayView2<'_, f64>,
        categories: &[usize],
        n_categories: usize,
        config: &SagConfig,
    ) -> Result<Self, TrainError> {
        let data = TrainingData::from_dense(features, categories, n_categories)?;
        Self::train(&data, config)
    }

    /// Create a model from known coefficients `[n_categories - 1, n_features]`.
    pub fn from_coefficients(mut coefficients: Array2<f64>, fit_intercept: bool) -> Self {
        assert!(
            coefficients.nrows() >= 1 && coefficients.ncols() >= 1,
            "coefficients need at least one class and the intercept slot"
        );
        if !fit_intercept {
            coefficients.column_mut(0).fill(0.0);
        }
        Self {
            coefficients,
            fit_intercept,
            n_epochs: 0,
            converged: false,
            loss_history: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn coefficients(&self) -> ArrayView2<'_, f64> {
        self.coefficients.view()
    }

    /// Number of categories, reference included.
    pub fn n_categories(&self) -> usize {
        self.coefficients.nrows() + 1
    }

    /// Number of feature slots, intercept included.
    pub fn n_features(&self) -> usize {
        self.coefficients.ncols()
    }

    pub fn fit_intercept(&self) -> bool {
        self.fit_intercept
    }

    /// Epochs run during training.
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Regularized mean training loss after each epoch.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the model as JSON.
    pub fn write_json_into<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, self)
    }

    /// Read a model written by [`write_json_into`](Self::write_json_into).
    ///
    /// Fails if the coefficients lack a class row or the intercept column.
    pub fn read_json_from<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let model: Self = serde_json::from_reader(reader)?;
        let (rows, cols) = model.coefficients.dim();
        if rows == 0 || cols == 0 {
            return Err(serde::de::Error::custom(format!(
                "coefficients of shape [{rows}, {cols}] need at least one class and the intercept slot"
            )));
        }
        Ok(model)
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Linear scores of the non-reference categories.
    pub fn predict_linear<R: TrainingRow>(&self, row: &R) -> Array1<f64> {
        predict_with(self.coefficients.view(), self.fit_intercept, row)
    }

    /// Probabilities of all categories, reference last.
    pub fn predict_proba<R: TrainingRow>(&self, row: &R) -> Array1<f64> {
        let scores = self.predict_linear(row);
        MultinomialLoss::new(self.n_categories()).probabilities(scores.view())
    }

    /// Most probable category.
    pub fn predict_category<R: TrainingRow>(&self, row: &R) -> usize {
        let scores = self.predict_linear(row);
        // The reference category scores 0.
        scores
            .iter()
            .enumerate()
            .fold((self.n_categories() - 1, 0.0f64), |best, (c, &s)| {
                if s > best.1 { (c, s) } else { best }
            })
            .0
    }
}
