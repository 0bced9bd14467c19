//! Property-based tests for the weight matrices.

use ndarray::Array2;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use sagreg::data::SparseRow;
use sagreg::repr::{ScaledWeightMatrix, SimpleWeightMatrix, WeightMatrix};

const N_CLASSES: usize = 2;
const N_FEATURES: usize = 5;

/// Strategy for finite coefficients of moderate size.
fn arb_coefficient() -> impl Strategy<Value = f64> {
    -100.0f64..100.0
}

fn arb_matrix() -> impl Strategy<Value = Array2<f64>> {
    prop_vec(arb_coefficient(), N_CLASSES * N_FEATURES).prop_map(|values| {
        Array2::from_shape_vec((N_CLASSES, N_FEATURES), values).expect("shape matches length")
    })
}

/// User features for a row with `N_FEATURES - 1` columns, roughly half zero.
fn arb_row() -> impl Strategy<Value = SparseRow> {
    prop_vec(prop_oneof![Just(0.0), -10.0f64..10.0], N_FEATURES - 1)
        .prop_map(|features| SparseRow::from_dense(0, 0, &features))
}

fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A zero delta leaves every coefficient bit-identical.
    #[test]
    fn zero_update_is_identity(
        data in arb_matrix(),
        row in arb_row(),
        scale in 0.1f64..2.0,
        fit_intercept in any::<bool>(),
    ) {
        let mut simple = SimpleWeightMatrix::from_array(data.clone(), fit_intercept);
        let mut scaled = ScaledWeightMatrix::from_array(data, fit_intercept);
        simple.scale(scale);
        scaled.scale(scale);
        let (simple_before, scaled_before) = (simple.weights(), scaled.weights());

        simple.update(|_, _, _| 0.0, fit_intercept, &row);
        simple.update_all(|_, _| 0.0, fit_intercept);
        scaled.update(|_, _, _| 0.0, fit_intercept, &row);
        scaled.update_all(|_, _| 0.0, fit_intercept);

        prop_assert_eq!(simple.weights(), simple_before);
        prop_assert_eq!(scaled.weights(), scaled_before);
    }

    /// Without an intercept, column 0 stays zero through updates and scaling.
    #[test]
    fn intercept_column_stays_zero(
        data in arb_matrix(),
        row in arb_row(),
        delta in arb_coefficient(),
        scale in 0.1f64..2.0,
    ) {
        let mut simple = SimpleWeightMatrix::from_array(data.clone(), false);
        let mut scaled = ScaledWeightMatrix::from_array(data, false);
        for _ in 0..3 {
            simple.update(|_, _, x| delta * x, false, &row);
            scaled.update(|_, _, x| delta * x, false, &row);
            simple.update_all(|_, _| delta, false);
            scaled.update_all(|_, _| delta, false);
            simple.scale(scale);
            scaled.scale(scale);
        }
        prop_assert!(simple.weights().column(0).iter().all(|&w| w == 0.0));
        prop_assert!(scaled.weights().column(0).iter().all(|&w| w == 0.0));
    }

    /// Both matrices apply the same effective updates.
    #[test]
    fn simple_and_scaled_agree(
        data in arb_matrix(),
        row in arb_row(),
        delta in -1.0f64..1.0,
        scales in prop_vec(0.5f64..1.5, 1..5),
    ) {
        let mut simple = SimpleWeightMatrix::from_array(data.clone(), true);
        let mut scaled = ScaledWeightMatrix::from_array(data, true);
        for &factor in &scales {
            simple.scale(factor);
            scaled.scale(factor);
            simple.update(|c, _, x| delta * x + c as f64, true, &row);
            scaled.update(|c, _, x| delta * x + c as f64, true, &row);
        }
        prop_assert!(max_abs_diff(&simple.weights(), &scaled.weights()) < 1e-8);

        let before = scaled.weights();
        scaled.normalize();
        prop_assert_eq!(scaled.scale_factor(), 1.0);
        prop_assert!(max_abs_diff(&scaled.weights(), &before) < 1e-8);
    }

    /// Prediction equals the dense product with the intercept prepended.
    #[test]
    fn predict_matches_dense_product(data in arb_matrix(), row in arb_row()) {
        let matrix = SimpleWeightMatrix::from_array(data.clone(), true);
        let mut dense = ndarray::Array1::zeros(N_FEATURES);
        dense[0] = 1.0;
        for (feature, value) in sagreg::data::TrainingRow::features(&row) {
            dense[feature] = value;
        }
        let expected = data.dot(&dense);
        let actual = matrix.predict(&row);
        for (a, e) in actual.iter().zip(expected.iter()) {
            prop_assert!((a - e).abs() < 1e-9);
        }
    }
}
