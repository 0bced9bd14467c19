//! Multinomial logistic loss against a reference category.
//!
//! Predictions are the linear scores of the `K - 1` stored classes; the
//! reference category `K - 1` has an implicit score of zero.
//!
//! ```text
//! p_c      = exp(s_c) / (1 + Σ_k exp(s_k))
//! loss     = ln(1 + Σ_k exp(s_k)) - s_y          (s_y = 0 for the reference)
//! grad_c   = p_c - 1[c == y]
//! ```

use ndarray::{Array1, ArrayView1};

use crate::utils::log_sum_exp_with_zero;

/// Softmax cross-entropy over `n_categories` with the last as reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultinomialLoss {
    n_categories: usize,
}

impl MultinomialLoss {
    pub fn new(n_categories: usize) -> Self {
        debug_assert!(n_categories >= 2, "n_categories must be >= 2");
        Self { n_categories }
    }

    #[inline]
    pub fn n_categories(&self) -> usize {
        self.n_categories
    }

    /// Index of the category with implicit zero weights.
    #[inline]
    pub fn reference_category(&self) -> usize {
        self.n_categories - 1
    }

    /// Negative log-likelihood of `category` given the linear scores.
    pub fn loss(&self, prediction: ArrayView1<'_, f64>, category: usize) -> f64 {
        debug_assert_eq!(prediction.len(), self.n_categories - 1);
        let scores = prediction.to_vec();
        let own = scores.get(category).copied().unwrap_or(0.0);
        log_sum_exp_with_zero(&scores) - own
    }

    /// Gradient of [`loss`](Self::loss) with respect to the scores.
    pub fn gradient(&self, prediction: ArrayView1<'_, f64>, category: usize) -> Array1<f64> {
        let mut probabilities = self.class_probabilities(prediction);
        if let Some(p) = probabilities.get_mut(category) {
            *p -= 1.0;
        }
        probabilities
    }

    /// Probabilities of the stored classes (reference excluded).
    pub fn class_probabilities(&self, prediction: ArrayView1<'_, f64>) -> Array1<f64> {
        let max = prediction.iter().copied().fold(0.0f64, f64::max);
        let mut exp = prediction.mapv(|s| (s - max).exp());
        let denom = (-max).exp() + exp.sum();
        exp.mapv_inplace(|e| e / denom);
        exp
    }

    /// Probabilities of all categories, reference last.
    pub fn probabilities(&self, prediction: ArrayView1<'_, f64>) -> Array1<f64> {
        let stored = self.class_probabilities(prediction);
        let reference = (1.0 - stored.sum()).max(0.0);
        let mut out = Array1::zeros(self.n_categories);
        out.slice_mut(ndarray::s![..self.n_categories - 1]).assign(&stored);
        out[self.n_categories - 1] = reference;
        out
    }
}
