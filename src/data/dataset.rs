//! In-memory classification training data.

use ndarray::ArrayView2;

use super::row::{ClassificationTrainingRow, SparseRow, TrainingRow};

/// Dataset conversion/validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("number of categories ({categories}) does not match number of rows ({rows})")]
    ShapeMismatch { rows: usize, categories: usize },

    #[error("row {row}: category {category} out of range for {n_categories} categories")]
    CategoryOutOfRange {
        row: usize,
        category: usize,
        n_categories: usize,
    },

    #[error("row {row}, feature {feature}: value is not finite")]
    NonFiniteFeature { row: usize, feature: usize },

    #[error("row {row}: feature {feature} out of range for {n_features} features")]
    FeatureOutOfRange {
        row: usize,
        feature: usize,
        n_features: usize,
    },

    #[error("at least 2 categories are required, got {0}")]
    TooFewCategories(usize),

    #[error("training data has no rows")]
    Empty,
}

/// Training rows plus the dimensions every updater is bound to.
///
/// `n_features` counts the intercept slot, so it equals the number of user
/// features plus one.
#[derive(Debug, Clone)]
pub struct TrainingData {
    rows: Vec<SparseRow>,
    n_features: usize,
    n_categories: usize,
}

impl TrainingData {
    /// Build training data from a dense sample-major matrix `[n_rows, n_user_features]`.
    ///
    /// Zero features are dropped from the sparse rows.
    pub fn from_dense(
        features: ArrayView2<'_, f64>,
        categories: &[usize],
        n_categories: usize,
    ) -> Result<Self, DatasetError> {
        let n_rows = features.nrows();
        if n_rows != categories.len() {
            return Err(DatasetError::ShapeMismatch {
                rows: n_rows,
                categories: categories.len(),
            });
        }

        let rows = features
            .outer_iter()
            .zip(categories)
            .enumerate()
            .map(|(id, (values, &category))| {
                if let Some(feature) = values.iter().position(|v| !v.is_finite()) {
                    return Err(DatasetError::NonFiniteFeature { row: id, feature });
                }
                let dense = values.to_vec();
                Ok(SparseRow::from_dense(id, category, &dense))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_rows(rows, features.ncols() + 1, n_categories)
    }

    /// Build training data from prepared sparse rows.
    ///
    /// Row ids are reassigned to match their position.
    pub fn from_rows(
        rows: Vec<SparseRow>,
        n_features: usize,
        n_categories: usize,
    ) -> Result<Self, DatasetError> {
        if n_categories < 2 {
            return Err(DatasetError::TooFewCategories(n_categories));
        }
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        for row in &rows {
            if row.category() >= n_categories {
                return Err(DatasetError::CategoryOutOfRange {
                    row: row.id(),
                    category: row.category(),
                    n_categories,
                });
            }
            if row.max_index() >= n_features {
                return Err(DatasetError::FeatureOutOfRange {
                    row: row.id(),
                    feature: row.max_index().saturating_sub(1),
                    n_features: n_features.saturating_sub(1),
                });
            }
            if let Some((slot, _)) = row.features().find(|(_, v)| !v.is_finite()) {
                return Err(DatasetError::NonFiniteFeature {
                    row: row.id(),
                    feature: slot - 1,
                });
            }
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(id, row)| row.with_id(id))
            .collect();

        Ok(Self {
            rows,
            n_features,
            n_categories,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of feature slots, intercept included.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn n_categories(&self) -> usize {
        self.n_categories
    }

    #[inline]
    pub fn row(&self, index: usize) -> &SparseRow {
        &self.rows[index]
    }

    #[inline]
    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }
}
