//! Lazy/eager updater equivalence.
//!
//! Both updaters see the same rows, gradients and step sizes. The gradient of
//! each step is computed from the eager coefficients so rounding differences
//! cannot feed back into the trajectory.

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rstest::rstest;

use sagreg::data::{ClassificationTrainingRow, SparseRow, TrainingData};
use sagreg::repr::{ScaledWeightMatrix, SimpleWeightMatrix, WeightMatrix};
use sagreg::testing::{DEFAULT_TOLERANCE, synthetic_classification};
use sagreg::training::sag::{
    EagerSagUpdaterFactory, LazySagUpdaterFactory, MultinomialLoss, Prior, Updater,
    UpdaterFactory,
};

const N_ROWS: usize = 120;
const N_EPOCHS: usize = 100;
const STEP: f64 = 0.1;

fn create<F: UpdaterFactory<SparseRow>>(factory: F) -> F::Updater {
    factory.create()
}

/// Run both updaters over `data` and compare after every flush.
///
/// Returns the final eager coefficients.
fn run_side_by_side<W: WeightMatrix>(
    data: &TrainingData,
    prior: Prior,
    mut lazy_beta: W,
    fit_intercept: bool,
    shuffle: bool,
) -> ndarray::Array2<f64> {
    let (n_rows, n_features, n_categories) =
        (data.n_rows(), data.n_features(), data.n_categories());
    let loss = MultinomialLoss::new(n_categories);
    let shrink = prior.shrink(STEP, n_rows);

    let mut eager_beta = SimpleWeightMatrix::zeros(n_features, n_categories, fit_intercept);
    let mut eager = create(EagerSagUpdaterFactory::new(n_rows, n_features, n_categories));
    let mut lazy = create(LazySagUpdaterFactory::new(n_rows, n_features, n_categories));
    let mut last_visited = vec![0usize; n_features];

    let mut order: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(9);
    let mut iteration = 0;

    for epoch in 0..N_EPOCHS {
        if shuffle {
            order.shuffle(&mut rng);
        }
        for &index in &order {
            let row = data.row(index);
            Updater::lazy_update(&mut lazy, &mut lazy_beta, row, &mut last_visited, iteration);

            let prediction = eager_beta.predict(row);
            let gradient = loss.gradient(prediction.view(), row.category());

            if shrink != 1.0 {
                eager_beta.scale(shrink);
                lazy_beta.scale(shrink);
            }
            eager.update(row, gradient.view(), &mut eager_beta, STEP, iteration);
            lazy.update(row, gradient.view(), &mut lazy_beta, STEP, iteration);
            iteration += 1;
        }

        Updater::<SparseRow>::reset_jit_system(&mut lazy, &mut lazy_beta, &mut last_visited);
        let (expected, actual) = (eager_beta.weights(), lazy_beta.weights());
        for ((idx, e), a) in expected.indexed_iter().zip(actual.iter()) {
            assert!(
                (e - a).abs() <= DEFAULT_TOLERANCE,
                "epoch {epoch}, cell {idx:?}: eager {e} vs lazy {a}"
            );
        }
        assert!(last_visited.iter().all(|&v| v == iteration - 1));
    }

    eager_beta.weights()
}

#[rstest]
#[case(0.1)]
#[case(0.5)]
#[case(0.9)]
fn lazy_matches_eager_without_prior(#[case] sparsity: f64) {
    let data = synthetic_classification(N_ROWS, 40, 3, sparsity, 1);
    let n = data.n_features();
    run_side_by_side(
        &data,
        Prior::Uniform,
        ScaledWeightMatrix::zeros(n, 3, true),
        true,
        true,
    );
}

#[rstest]
#[case(0.1)]
#[case(0.5)]
#[case(0.9)]
fn lazy_matches_eager_with_gauss_prior(#[case] sparsity: f64) {
    let data = synthetic_classification(N_ROWS, 40, 4, sparsity, 2);
    let n = data.n_features();
    let weights = run_side_by_side(
        &data,
        Prior::gauss(1.0),
        ScaledWeightMatrix::zeros(n, 4, true),
        true,
        true,
    );
    assert!(weights.iter().any(|&w| w != 0.0));
}

#[test]
fn lazy_on_simple_matrix_matches_without_scaling() {
    let data = synthetic_classification(N_ROWS, 25, 2, 0.7, 3);
    let n = data.n_features();
    run_side_by_side(
        &data,
        Prior::Uniform,
        SimpleWeightMatrix::zeros(n, 2, true),
        true,
        false,
    );
}

#[test]
fn equivalence_holds_without_intercept() {
    let data = synthetic_classification(N_ROWS, 30, 3, 0.6, 4);
    let n = data.n_features();
    let weights = run_side_by_side(
        &data,
        Prior::gauss(2.0),
        ScaledWeightMatrix::zeros(n, 3, false),
        false,
        true,
    );
    assert!(weights.column(0).iter().all(|&w| w == 0.0));
}

#[test]
fn single_step_worked_example() {
    use ndarray::array;

    let row = SparseRow::from_dense(0, 0, &[1.0, 1.0]);
    let gradient = array![3.0, -2.0];
    let expected = array![[-3.0, -3.0, -3.0], [2.0, 2.0, 2.0]];

    let mut eager_beta = SimpleWeightMatrix::zeros(3, 3, true);
    let mut eager = create(EagerSagUpdaterFactory::new(1, 3, 3));
    eager.update(&row, gradient.view(), &mut eager_beta, 1.0, 0);
    assert_eq!(eager_beta.weights(), expected);

    let mut lazy_beta = ScaledWeightMatrix::zeros(3, 3, true);
    let mut lazy = create(LazySagUpdaterFactory::new(1, 3, 3));
    let mut last_visited = vec![0; 3];
    Updater::lazy_update(&mut lazy, &mut lazy_beta, &row, &mut last_visited, 0);
    lazy.update(&row, gradient.view(), &mut lazy_beta, 1.0, 0);
    Updater::<SparseRow>::reset_jit_system(&mut lazy, &mut lazy_beta, &mut last_visited);
    assert_abs_diff_eq!(lazy_beta.weights(), expected, epsilon = 1e-12);
}
