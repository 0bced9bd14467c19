//! Weight matrix with eager scaling.

use ndarray::{Array2, s};

use super::{WeightMatrix, check_dimensions, check_feature};
use crate::data::{INTERCEPT, TrainingRow};

/// Dense weight matrix that applies [`scale`](WeightMatrix::scale) to every
/// stored coefficient immediately.
///
/// Scaling costs O(n_classes × n_features); [`scale_factor`](WeightMatrix::scale_factor)
/// is always `1.0`. Pairs with the eager updater.
///
/// # Example
///
/// ```
/// use sagreg::repr::{SimpleWeightMatrix, WeightMatrix};
/// use ndarray::array;
///
/// let mut beta = SimpleWeightMatrix::from_array(array![[1.0, 2.0], [3.0, 4.0]], true);
/// beta.scale(0.5);
///
/// assert_eq!(beta.weights(), array![[1.0, 1.0], [3.0, 2.0]]);
/// assert_eq!(beta.scale_factor(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleWeightMatrix {
    /// Coefficients: shape `[n_classes, n_features]`, column 0 is the intercept.
    data: Array2<f64>,
    fit_intercept: bool,
}

impl SimpleWeightMatrix {
    /// Create a zero matrix for `n_features` slots (intercept included) and
    /// `n_categories` categories.
    pub fn zeros(n_features: usize, n_categories: usize, fit_intercept: bool) -> Self {
        check_dimensions(n_features, n_categories);
        Self {
            data: Array2::zeros((n_categories - 1, n_features)),
            fit_intercept,
        }
    }

    /// Wrap an existing `[n_classes, n_features]` matrix.
    ///
    /// Column 0 is cleared when `fit_intercept` is false.
    pub fn from_array(mut data: Array2<f64>, fit_intercept: bool) -> Self {
        check_dimensions(data.ncols(), data.nrows() + 1);
        if !fit_intercept {
            data.column_mut(INTERCEPT).fill(0.0);
        }
        Self {
            data,
            fit_intercept,
        }
    }
}

impl WeightMatrix for SimpleWeightMatrix {
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
        self.data[[class, feature]]
    }

    fn weights(&self) -> Array2<f64> {
        self.data.clone()
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
            for (class, cell) in self.data.column_mut(feature).iter_mut().enumerate() {
                *cell += value(class, feature, x);
            }
        }
    }

    fn update_all<F>(&mut self, mut value: F, fit_intercept: bool)
    where
        F: FnMut(usize, usize) -> f64,
    {
        let first = if fit_intercept { 0 } else { 1 };
        for ((class, feature), cell) in self.data.slice_mut(s![.., first..]).indexed_iter_mut() {
            *cell += value(class, feature + first);
        }
    }

    fn scale(&mut self, factor: f64) {
        self.data
            .slice_mut(s![.., INTERCEPT + 1..])
            .mapv_inplace(|v| v * factor);
    }

    #[inline]
    fn scale_factor(&self) -> f64 {
        1.0
    }

    #[inline]
    fn normalize(&mut self) {}
}
