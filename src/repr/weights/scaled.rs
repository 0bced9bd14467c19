//! Weight matrix with a lazy scale register.

use ndarray::{Array2, s};

use super::{WeightMatrix, check_dimensions, check_feature};
use crate::data::{INTERCEPT, TrainingRow};

/// Dense weight matrix that defers [`scale`](WeightMatrix::scale).
///
/// Stores raw coefficients `raw` and a scale register `s`:
///
/// ```text
/// effective[[c, 0]] = raw[[c, 0]]          (intercept, never scaled)
/// effective[[c, f]] = raw[[c, f]] * s      (f > 0)
/// ```
///
/// Scaling multiplies `s` only. Updates divide their effective delta by `s`
/// before adding it to `raw`. The register is folded back into `raw` by
/// [`normalize`](WeightMatrix::normalize), which the lazy updater calls once
/// all pending work has been flushed.
#[derive(Debug, Clone)]
pub struct ScaledWeightMatrix {
    /// Raw coefficients: shape `[n_classes, n_features]`.
    data: Array2<f64>,
    scale: f64,
    fit_intercept: bool,
}

impl ScaledWeightMatrix {
    /// Create a zero matrix for `n_features` slots (intercept included) and
    /// `n_categories` categories.
    pub fn zeros(n_features: usize, n_categories: usize, fit_intercept: bool) -> Self {
        check_dimensions(n_features, n_categories);
        Self {
            data: Array2::zeros((n_categories - 1, n_features)),
            scale: 1.0,
            fit_intercept,
        }
    }

    /// Wrap an existing effective `[n_classes, n_features]` matrix.
    ///
    /// Column 0 is cleared when `fit_intercept` is false.
    pub fn from_array(mut data: Array2<f64>, fit_intercept: bool) -> Self {
        check_dimensions(data.ncols(), data.nrows() + 1);
        if !fit_intercept {
            data.column_mut(INTERCEPT).fill(0.0);
        }
        Self {
            data,
            scale: 1.0,
            fit_intercept,
        }
    }

    /// Factor converting an effective delta for `feature` into a raw delta.
    #[inline]
    fn raw_factor(&self, feature: usize) -> f64 {
        if feature == INTERCEPT {
            1.0
        } else {
            self.scale.recip()
        }
    }
}

impl WeightMatrix for ScaledWeightMatrix {
    #[inline]
    fn n_classes(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    fn fit_intercept(&self) -> bool {
        self.fit_intercept
    }

    #[inline]
    fn weight(&self, class: usize, feature: usize) -> f64 {
        let raw = self.data[[class, feature]];
        if feature == INTERCEPT {
            raw
        } else {
            raw * self.scale
        }
    }

    fn weights(&self) -> Array2<f64> {
        let mut out = self.data.clone();
        out.slice_mut(s![.., INTERCEPT + 1..])
            .mapv_inplace(|v| v * self.scale);
        out
    }

    fn update<R, F>(&mut self, mut value: F, fit_intercept: bool, row: &R)
    where
        R: TrainingRow,
        F: FnMut(usize, usize, f64) -> f64,
    {
        let n_features = self.n_features();
        for (feature, x) in row.features() {
            if feature == INTERCEPT && !fit_intercept {
                continue;
            }
            check_feature(feature, n_features);
            let factor = self.raw_factor(feature);
            for (class, cell) in self.data.column_mut(feature).iter_mut().enumerate() {
                *cell += value(class, feature, x) * factor;
            }
        }
    }

    fn update_all<F>(&mut self, mut value: F, fit_intercept: bool)
    where
        F: FnMut(usize, usize) -> f64,
    {
        let first = if fit_intercept { 0 } else { 1 };
        let inv_scale = self.scale.recip();
        for ((class, col), cell) in self.data.slice_mut(s![.., first..]).indexed_iter_mut() {
            let feature = col + first;
            let factor = if feature == INTERCEPT { 1.0 } else { inv_scale };
            *cell += value(class, feature) * factor;
        }
    }

    /// Multiply the scale register by `factor`.
    ///
    /// # Panics
    ///
    /// Panics if `factor` is not a positive finite number; the register
    /// cannot represent a collapse to zero.
    fn scale(&mut self, factor: f64) {
        assert!(
            factor > 0.0 && factor.is_finite(),
            "scale factor must be positive and finite, got {factor}"
        );
        self.scale *= factor;
    }

    #[inline]
    fn scale_factor(&self) -> f64 {
        self.scale
    }

    fn normalize(&mut self) {
        if self.scale == 1.0 {
            return;
        }
        let scale = self.scale;
        self.data
            .slice_mut(s![.., INTERCEPT + 1..])
            .mapv_inplace(|v| v * scale);
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SparseRow;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn scale_is_deferred() {
        let mut beta = ScaledWeightMatrix::from_array(array![[1.0, 2.0, 4.0]], true);
        beta.scale(0.5);
        beta.scale(0.5);
        assert_eq!(beta.scale_factor(), 0.25);
        assert_eq!(beta.weights(), array![[1.0, 0.5, 1.0]]);

        beta.normalize();
        assert_eq!(beta.scale_factor(), 1.0);
        assert_eq!(beta.weights(), array![[1.0, 0.5, 1.0]]);
    }

    #[test]
    fn updates_are_effective_under_scale() {
        let mut beta = ScaledWeightMatrix::zeros(3, 2, true);
        beta.scale(0.1);
        let row = SparseRow::from_dense(0, 0, &[1.0, 1.0]);
        beta.update(|_, _, _| 2.0, true, &row);
        assert_abs_diff_eq!(beta.weights(), array![[2.0, 2.0, 2.0]], epsilon = 1e-12);

        beta.update_all(|_, _| 1.0, true);
        assert_abs_diff_eq!(beta.weights(), array![[3.0, 3.0, 3.0]], epsilon = 1e-12);

        // Later scaling applies to what was added before it.
        beta.scale(0.5);
        assert_abs_diff_eq!(beta.weights(), array![[3.0, 1.5, 1.5]], epsilon = 1e-12);
    }

    #[test]
    fn predict_applies_register() {
        let mut beta = ScaledWeightMatrix::from_array(array![[1.0, 2.0, 3.0]], true);
        beta.scale(2.0);
        let row = SparseRow::from_dense(0, 0, &[1.0, 1.0]);
        assert_abs_diff_eq!(beta.predict(&row)[0], 11.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "positive and finite")]
    fn rejects_zero_scale() {
        let mut beta = ScaledWeightMatrix::zeros(2, 2, true);
        beta.scale(0.0);
    }
}
