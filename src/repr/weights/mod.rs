//! Weight matrices for multinomial logistic regression.
//!
//! A weight matrix holds one row per non-reference category and one column
//! per feature slot:
//!
//! ```text
//! weights[[class, 0]]       → intercept (zero when not fitting an intercept)
//! weights[[class, feature]] → coefficient of feature slot `feature`
//! ```
//!
//! The reference category (the last one) has implicit all-zero weights and is
//! not stored.
//!
//! Two implementations differ only in how [`WeightMatrix::scale`] is applied:
//!
//! - [`SimpleWeightMatrix`]: multiplies every stored coefficient immediately.
//! - [`ScaledWeightMatrix`]: keeps a scale register so scaling is O(1); it is
//!   the matrix the lazy updater expects when the training loop shrinks
//!   weights every step.
//!
//! The intercept column is never scaled.

mod scaled;
mod simple;

pub use scaled::ScaledWeightMatrix;
pub use simple::SimpleWeightMatrix;

use ndarray::{Array1, Array2, ArrayView2};

use crate::data::TrainingRow;

/// Coefficient storage mutated by the SAG updaters.
///
/// All values passed to and returned from this trait are *effective* values,
/// i.e. with any outstanding scale already applied.
pub trait WeightMatrix {
    /// Number of stored classes (`n_categories - 1`).
    fn n_classes(&self) -> usize;

    /// Number of feature slots, intercept included.
    fn n_features(&self) -> usize;

    /// Whether column 0 holds a fitted intercept.
    fn fit_intercept(&self) -> bool;

    /// Effective coefficient for a class and feature slot.
    fn weight(&self, class: usize, feature: usize) -> f64;

    /// Materialized effective matrix `[n_classes, n_features]`.
    fn weights(&self) -> Array2<f64>;

    /// Add `value(class, feature, feature_value)` to each cell the row touches.
    ///
    /// Column 0 is skipped unless `fit_intercept` is set.
    fn update<R, F>(&mut self, value: F, fit_intercept: bool, row: &R)
    where
        R: TrainingRow,
        F: FnMut(usize, usize, f64) -> f64;

    /// Add `value(class, feature)` to every cell.
    ///
    /// Column 0 is skipped unless `fit_intercept` is set.
    fn update_all<F>(&mut self, value: F, fit_intercept: bool)
    where
        F: FnMut(usize, usize) -> f64;

    /// Linear predictions for every stored class.
    fn predict<R: TrainingRow>(&self, row: &R) -> Array1<f64> {
        let mut out = Array1::zeros(self.n_classes());
        let skip_intercept = !self.fit_intercept();
        for (feature, value) in row.features() {
            if skip_intercept && feature == 0 {
                continue;
            }
            for (class, out) in out.iter_mut().enumerate() {
                *out += self.weight(class, feature) * value;
            }
        }
        out
    }

    /// Multiply every non-intercept coefficient by `factor`.
    fn scale(&mut self, factor: f64);

    /// Outstanding scale that stored coefficients still have to be multiplied by.
    fn scale_factor(&self) -> f64;

    /// Fold the outstanding scale into the stored coefficients.
    fn normalize(&mut self);
}

/// Linear predictions of a row against a materialized `[n_classes, n_features]` matrix.
///
/// Matches [`WeightMatrix::predict`] on a matrix whose
/// [`weights`](WeightMatrix::weights) equal `weights`.
pub fn predict_with<R: TrainingRow>(
    weights: ArrayView2<'_, f64>,
    fit_intercept: bool,
    row: &R,
) -> Array1<f64> {
    let mut out = Array1::zeros(weights.nrows());
    for (feature, value) in row.features() {
        if !fit_intercept && feature == 0 {
            continue;
        }
        check_feature(feature, weights.ncols());
        out.scaled_add(value, &weights.column(feature));
    }
    out
}

/// Validate dimensions shared by both matrix constructors.
fn check_dimensions(n_features: usize, n_categories: usize) {
    assert!(n_features >= 1, "weight matrix needs at least the intercept slot");
    assert!(
        n_categories >= 2,
        "weight matrix needs at least 2 categories, got {n_categories}"
    );
}

/// Panic with a descriptive message on an out-of-range feature slot.
#[inline]
fn check_feature(feature: usize, n_features: usize) {
    assert!(
        feature < n_features,
        "feature index {feature} out of bounds for {n_features} feature slots"
    );
}
