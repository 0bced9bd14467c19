//! Training rows with sparse feature access.
//!
//! Rows expose their features in a shared index space where index `0` is the
//! intercept (always `1.0`) and user features start at index `1`.
//!
//! ```text
//! user features:  [0.5, 0.0, 2.0]
//! row features:   (0, 1.0), (1, 0.5), (3, 2.0)
//! ```

/// Feature index reserved for the intercept.
pub const INTERCEPT: usize = 0;

/// A row the updaters can read.
///
/// Implementations must yield features in strictly ascending index order,
/// starting with the intercept entry `(0, 1.0)`. The iterator must be
/// restartable: every call to [`features`](Self::features) yields the same
/// sequence.
pub trait TrainingRow {
    /// Position of this row in its training data (`0..n_rows`).
    fn id(&self) -> usize;

    /// Non-zero features as `(index, value)` pairs, intercept first.
    fn features(&self) -> impl Iterator<Item = (usize, f64)> + '_;

    /// Number of entries yielded by [`features`](Self::features).
    fn feature_count(&self) -> usize;

    /// Squared Euclidean norm of the feature vector, intercept included.
    fn squared_norm(&self) -> f64 {
        self.features().map(|(_, v)| v * v).sum()
    }
}

/// A training row with a category label.
///
/// Categories live in `0..n_categories`; the last one is the reference
/// category whose weights are implicitly zero.
pub trait ClassificationTrainingRow: TrainingRow {
    fn category(&self) -> usize;
}

/// Sparse row storing only non-zero user features.
///
/// Indices are stored in the shifted index space (user feature `i` is stored
/// as `i + 1`), so iteration is a plain zip over the two vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    id: usize,
    category: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseRow {
    /// Build a row from dense user features, dropping exact zeros.
    pub fn from_dense(id: usize, category: usize, features: &[f64]) -> Self {
        let (indices, values) = features
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, &v)| (i + 1, v))
            .unzip();
        Self {
            id,
            category,
            indices,
            values,
        }
    }

    /// Build a row from `(user_feature_index, value)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if indices are not strictly ascending.
    pub fn from_entries(id: usize, category: usize, entries: Vec<(usize, f64)>) -> Self {
        assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "sparse row {id}: feature indices must be strictly ascending"
        );
        let (indices, values) = entries.into_iter().map(|(i, v)| (i + 1, v)).unzip();
        Self {
            id,
            category,
            indices,
            values,
        }
    }

    /// Return the same row under a new id.
    pub(crate) fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    /// Largest feature index in the shifted space (0 if only the intercept).
    pub fn max_index(&self) -> usize {
        self.indices.last().copied().unwrap_or(INTERCEPT)
    }

    /// Number of stored (non-zero) user features.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

impl TrainingRow for SparseRow {
    #[inline]
    fn id(&self) -> usize {
        self.id
    }

    #[inline]
    fn features(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        std::iter::once((INTERCEPT, 1.0)).chain(
            self.indices
                .iter()
                .copied()
                .zip(self.values.iter().copied()),
        )
    }

    #[inline]
    fn feature_count(&self) -> usize {
        self.indices.len() + 1
    }
}

impl ClassificationTrainingRow for SparseRow {
    #[inline]
    fn category(&self) -> usize {
        self.category
    }
}
