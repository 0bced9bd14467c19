//! Priors on the coefficients.
//!
//! A Gauss prior with variance `σ²` adds `λ/2 · ‖w‖²` to the mean row loss with
//! `λ = 1 / (σ² · n_rows)`. SAG applies it by shrinking the weight matrix by
//! `1 - step · λ` before every update. The intercept is never penalized.

use ndarray::{ArrayView2, s};

/// Prior placed on the non-intercept coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Prior {
    /// No regularization.
    #[default]
    Uniform,
    /// Zero-mean Gaussian prior (L2 regularization).
    Gauss { variance: f64 },
}

impl Prior {
    /// Gauss prior with the given variance.
    pub fn gauss(variance: f64) -> Self {
        Self::Gauss { variance }
    }

    /// Per-row regularization strength.
    pub fn lambda(&self, n_rows: usize) -> f64 {
        match *self {
            Self::Uniform => 0.0,
            Self::Gauss { variance } => 1.0 / (variance * n_rows.max(1) as f64),
        }
    }

    /// Factor the weight matrix is scaled by before a step of `step_size`.
    #[inline]
    pub fn shrink(&self, step_size: f64, n_rows: usize) -> f64 {
        1.0 - step_size * self.lambda(n_rows)
    }

    /// `λ/2 · ‖w‖²` over the non-intercept columns of `weights`.
    pub fn penalty(&self, weights: ArrayView2<'_, f64>, n_rows: usize) -> f64 {
        let lambda = self.lambda(n_rows);
        if lambda == 0.0 || weights.ncols() < 2 {
            return 0.0;
        }
        let coefficients = weights.slice(s![.., 1..]);
        0.5 * lambda * coefficients.iter().map(|w| w * w).sum::<f64>()
    }
}
