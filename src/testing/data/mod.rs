use ndarray::Array2;
use rand::prelude::*;

use crate::data::{SparseRow, TrainingData};

/// Generate random features `[rows, cols]` where each entry is zero with
/// probability `sparsity` and uniform in `[-1, 1]` otherwise.
pub fn random_sparse_features(rows: usize, cols: usize, sparsity: f64, seed: u64) -> Array2<f64> {
	assert!((0.0..=1.0).contains(&sparsity));
	let mut rng = StdRng::seed_from_u64(seed);
	Array2::from_shape_fn((rows, cols), |_| {
		if rng.r#gen::<f64>() < sparsity {
			0.0
		} else {
			rng.r#gen::<f64>() * 2.0 - 1.0
		}
	})
}

/// Label rows with the argmax of a random linear model over all categories.
///
/// Returns one category per row of `features`.
pub fn linear_categories(features: &Array2<f64>, n_categories: usize, seed: u64) -> Vec<usize> {
	let mut rng = StdRng::seed_from_u64(seed);
	let cols = features.ncols();
	let weights = Array2::from_shape_fn((n_categories, cols + 1), |_| rng.r#gen::<f64>() * 4.0 - 2.0);

	features
		.outer_iter()
		.map(|x| {
			(0..n_categories)
				.map(|c| {
					let w = weights.row(c);
					w[0] + x.iter().zip(w.iter().skip(1)).map(|(a, b)| a * b).sum::<f64>()
				})
				.enumerate()
				.fold((0, f64::NEG_INFINITY), |best, (c, s)| if s > best.1 { (c, s) } else { best })
				.0
		})
		.collect()
}

/// Seeded synthetic classification data.
///
/// `sparsity` is the probability that a user feature is zero.
pub fn synthetic_classification(
	n_rows: usize,
	n_user_features: usize,
	n_categories: usize,
	sparsity: f64,
	seed: u64,
) -> TrainingData {
	let features = random_sparse_features(n_rows, n_user_features, sparsity, seed);
	let categories = linear_categories(&features, n_categories, seed.wrapping_add(1));
	let rows = features
		.outer_iter()
		.zip(&categories)
		.enumerate()
		.map(|(id, (x, &category))| SparseRow::from_dense(id, category, &x.to_vec()))
		.collect();
	TrainingData::from_rows(rows, n_user_features + 1, n_categories)
		.expect("synthetic rows are valid training data")
}
