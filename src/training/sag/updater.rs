//! Stochastic average gradient (SAG) updaters.
//!
//! SAG keeps the last gradient seen for every row and steps along the average
//! of all of them:
//!
//! ```text
//! sum[c][f]  = Σ_rows memory[c][row] · x_row[f]
//! beta[c][f] -= step · sum[c][f] / n_covered          (for every f, every step)
//! ```
//!
//! Two variants produce the same coefficients:
//!
//! - [`EagerSagUpdater`]: applies the averaged step to every coefficient on
//!   every call. O(n_classes × n_features) per step.
//! - [`LazySagUpdater`]: applies the step only to the features of the current
//!   row and replays the skipped steps of a feature in closed form the next
//!   time that feature is touched ([`lazy_update`](Updater::lazy_update)) or
//!   when the system is flushed ([`reset_jit_system`](Updater::reset_jit_system)).
//!   O(n_classes × nnz) per step.
//!
//! # Calling Protocol
//!
//! For every training step `t` (strictly increasing over the updater's lifetime):
//!
//! ```text
//! updater.lazy_update(&mut beta, row, &mut last_visited, t);   // catch up row features
//! ... predict, compute gradient, optionally beta.scale(..) ...
//! updater.update(row, gradient, &mut beta, step, t);
//! ```
//!
//! and `reset_jit_system` before reading all coefficients. Skipping
//! `lazy_update` before `update` leaves stale coefficients; this is not checked.

use ndarray::{Array2, ArrayView1};

use crate::data::{INTERCEPT, TrainingRow};
use crate::repr::WeightMatrix;

/// SAG updater selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UpdaterKind {
    /// Dense step every iteration - simple, cost grows with the feature count
    Eager,
    /// Just-in-time catch-up of untouched features - cost grows with row sparsity
    #[default]
    Lazy,
}

/// Applies one SAG step for one row.
///
/// Updaters that apply everything immediately keep the provided no-op
/// [`lazy_update`](Self::lazy_update) and [`reset_jit_system`](Self::reset_jit_system).
pub trait Updater<R: TrainingRow> {
    /// Record `gradient` as the row's latest gradient and step the coefficients.
    ///
    /// `gradient` has one entry per non-reference category.
    fn update<W: WeightMatrix>(
        &mut self,
        row: &R,
        gradient: ArrayView1<'_, f64>,
        beta: &mut W,
        step_size: f64,
        iteration: usize,
    );

    /// Bring the row's features up to date before `iteration` is applied.
    ///
    /// Sets `last_visited[f] = iteration` for every feature of the row.
    fn lazy_update<W: WeightMatrix>(
        &mut self,
        _beta: &mut W,
        _row: &R,
        _last_visited: &mut [usize],
        _iteration: usize,
    ) {
    }

    /// Bring every feature up to date and clear deferred state.
    fn reset_jit_system<W: WeightMatrix>(&mut self, _beta: &mut W, _last_visited: &mut [usize]) {}
}

/// Builds fresh updaters bound to fixed dimensions.
pub trait UpdaterFactory<R: TrainingRow> {
    type Updater: Updater<R>;

    fn create(&self) -> Self::Updater;
}

// =============================================================================
// Gradient memory
// =============================================================================

/// Per-row gradient memory and its feature-wise sum.
#[derive(Debug, Clone)]
struct GradientMemory {
    /// Last gradient per row: shape `[n_classes, n_rows]`.
    per_row: Array2<f64>,
    /// Σ per_row · x: shape `[n_classes, n_features]`.
    sum: Array2<f64>,
    seen: Vec<bool>,
    n_covered: usize,
    /// Scratch for the gradient change of the current row.
    diff: Vec<f64>,
}

impl GradientMemory {
    fn new(n_rows: usize, n_features: usize, n_categories: usize) -> Self {
        assert!(
            n_categories >= 2,
            "SAG updater needs at least 2 categories, got {n_categories}"
        );
        let n_classes = n_categories - 1;
        Self {
            per_row: Array2::zeros((n_classes, n_rows)),
            sum: Array2::zeros((n_classes, n_features)),
            seen: vec![false; n_rows],
            n_covered: 0,
            diff: vec![0.0; n_classes],
        }
    }

    #[inline]
    fn n_features(&self) -> usize {
        self.sum.ncols()
    }

    /// Replace the row's stored gradient and fold the change into `sum`.
    fn record<R: TrainingRow>(&mut self, row: &R, gradient: ArrayView1<'_, f64>) {
        let (n_classes, n_rows) = self.per_row.dim();
        assert_eq!(
            gradient.len(),
            n_classes,
            "gradient length {} does not match {} non-reference categories",
            gradient.len(),
            n_classes
        );
        let id = row.id();
        assert!(id < n_rows, "row id {id} out of bounds for {n_rows} rows");

        for (c, &g) in gradient.iter().enumerate() {
            self.diff[c] = g - self.per_row[[c, id]];
            self.per_row[[c, id]] = g;
        }

        let n_features = self.n_features();
        for (feature, x) in row.features() {
            assert!(
                feature < n_features,
                "feature index {feature} out of bounds for {n_features} feature slots"
            );
            for (c, &d) in self.diff.iter().enumerate() {
                self.sum[[c, feature]] += d * x;
            }
        }

        if !self.seen[id] {
            self.seen[id] = true;
            self.n_covered += 1;
        }
    }

    #[inline]
    fn n_covered(&self) -> f64 {
        self.n_covered as f64
    }
}

fn check_matrix<W: WeightMatrix>(beta: &W, memory: &GradientMemory) {
    debug_assert_eq!(
        (beta.n_classes(), beta.n_features()),
        memory.sum.dim(),
        "weight matrix shape does not match the updater"
    );
}

// =============================================================================
// EagerSagUpdater
// =============================================================================

/// SAG updater that steps every coefficient on every call.
///
/// # Example
///
/// ```
/// use sagreg::data::SparseRow;
/// use sagreg::repr::{SimpleWeightMatrix, WeightMatrix};
/// use sagreg::training::sag::{EagerSagUpdater, Updater};
/// use ndarray::array;
///
/// let mut beta = SimpleWeightMatrix::zeros(3, 3, true);
/// let mut updater = EagerSagUpdater::new(1, 3, 3);
/// let row = SparseRow::from_dense(0, 0, &[1.0, 1.0]);
///
/// updater.update(&row, array![3.0, -2.0].view(), &mut beta, 1.0, 0);
/// assert_eq!(beta.weights(), array![[-3.0, -3.0, -3.0], [2.0, 2.0, 2.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct EagerSagUpdater {
    memory: GradientMemory,
}

impl EagerSagUpdater {
    /// Create an updater for `n_rows` rows, `n_features` slots (intercept
    /// included) and `n_categories` categories.
    pub fn new(n_rows: usize, n_features: usize, n_categories: usize) -> Self {
        Self {
            memory: GradientMemory::new(n_rows, n_features, n_categories),
        }
    }

    /// Number of distinct rows seen so far.
    pub fn n_covered(&self) -> usize {
        self.memory.n_covered
    }
}

impl<R: TrainingRow> Updater<R> for EagerSagUpdater {
    fn update<W: WeightMatrix>(
        &mut self,
        row: &R,
        gradient: ArrayView1<'_, f64>,
        beta: &mut W,
        step_size: f64,
        _iteration: usize,
    ) {
        check_matrix(beta, &self.memory);
        self.memory.record(row, gradient);

        let n = self.memory.n_covered();
        let sum = &self.memory.sum;
        let fit_intercept = beta.fit_intercept();
        beta.update_all(|c, f| -step_size * sum[[c, f]] / n, fit_intercept);
    }
}

/// Builds [`EagerSagUpdater`]s.
#[derive(Debug, Clone, Copy)]
pub struct EagerSagUpdaterFactory {
    n_rows: usize,
    n_features: usize,
    n_categories: usize,
}

impl EagerSagUpdaterFactory {
    pub fn new(n_rows: usize, n_features: usize, n_categories: usize) -> Self {
        Self {
            n_rows,
            n_features,
            n_categories,
        }
    }
}

impl<R: TrainingRow> UpdaterFactory<R> for EagerSagUpdaterFactory {
    type Updater = EagerSagUpdater;

    fn create(&self) -> EagerSagUpdater {
        EagerSagUpdater::new(self.n_rows, self.n_features, self.n_categories)
    }
}

// =============================================================================
// LazySagUpdater
// =============================================================================

/// SAG updater that defers the averaged step for features a row does not touch.
///
/// Between two touches of feature `f` its gradient sum is constant, so the
/// skipped steps `j+1 ..= k-1` collapse to one multiplication:
///
/// ```text
/// Δ[c][f] = -sum[c][f] · Σ_{t=j+1}^{k-1} step_t / n_t · (scale_now / scale_t)
/// ```
///
/// The updater keeps two prefix sums over the steps since the last flush:
/// `plain[t] = Σ step/n` (for the intercept, which is never scaled) and
/// `decayed[t] = Σ step/(n · scale_t)` where `scale_t` is the weight matrix's
/// [`scale_factor`](WeightMatrix::scale_factor) when step `t` was applied.
///
/// Scaling between steps is only replayed correctly on a matrix that defers
/// scaling (such as [`ScaledWeightMatrix`](crate::repr::ScaledWeightMatrix)).
#[derive(Debug, Clone)]
pub struct LazySagUpdater {
    memory: GradientMemory,
    /// `plain[i]` covers steps `window_start ..= window_start + i`.
    plain: Vec<f64>,
    decayed: Vec<f64>,
    /// First iteration covered by the prefix sums.
    window_start: usize,
    last_iteration: Option<usize>,
}

impl LazySagUpdater {
    /// Create an updater for `n_rows` rows, `n_features` slots (intercept
    /// included) and `n_categories` categories.
    pub fn new(n_rows: usize, n_features: usize, n_categories: usize) -> Self {
        Self {
            memory: GradientMemory::new(n_rows, n_features, n_categories),
            plain: Vec::new(),
            decayed: Vec::new(),
            window_start: 0,
            last_iteration: None,
        }
    }

    /// Number of distinct rows seen so far.
    pub fn n_covered(&self) -> usize {
        self.memory.n_covered
    }

    /// Prefix sum through `iteration` (zero before the window).
    #[inline]
    fn cumulative(&self, sums: &[f64], iteration: usize) -> f64 {
        if iteration < self.window_start || sums.is_empty() {
            return 0.0;
        }
        let idx = (iteration - self.window_start).min(sums.len() - 1);
        sums[idx]
    }

    /// Pending effective delta for a cell last brought up to date at `from`,
    /// covering steps `from+1 ..= to`.
    #[inline]
    fn pending(&self, class: usize, feature: usize, from: usize, to: usize, scale: f64) -> f64 {
        if from >= to {
            return 0.0;
        }
        let sum = self.memory.sum[[class, feature]];
        if feature == INTERCEPT {
            -sum * (self.cumulative(&self.plain, to) - self.cumulative(&self.plain, from))
        } else {
            -sum * (self.cumulative(&self.decayed, to) - self.cumulative(&self.decayed, from))
                * scale
        }
    }

    fn check_last_visited(&self, last_visited: &[usize]) {
        assert_eq!(
            last_visited.len(),
            self.memory.n_features(),
            "last_visited length {} does not match {} feature slots",
            last_visited.len(),
            self.memory.n_features()
        );
    }

    /// Append the prefix sums for `iteration`, carrying them over any gap.
    fn record_step(&mut self, iteration: usize, plain_step: f64, decayed_step: f64) {
        assert!(
            iteration >= self.window_start,
            "iteration {iteration} precedes the last flush at {}",
            self.window_start
        );
        let last_plain = self.plain.last().copied().unwrap_or(0.0);
        let last_decayed = self.decayed.last().copied().unwrap_or(0.0);
        while self.window_start + self.plain.len() < iteration {
            self.plain.push(last_plain);
            self.decayed.push(last_decayed);
        }
        self.plain.push(last_plain + plain_step);
        self.decayed.push(last_decayed + decayed_step);
    }
}

impl<R: TrainingRow> Updater<R> for LazySagUpdater {
    fn update<W: WeightMatrix>(
        &mut self,
        row: &R,
        gradient: ArrayView1<'_, f64>,
        beta: &mut W,
        step_size: f64,
        iteration: usize,
    ) {
        check_matrix(beta, &self.memory);
        if let Some(last) = self.last_iteration {
            assert!(
                iteration > last,
                "iterations must strictly increase: got {iteration} after {last}"
            );
        }
        self.memory.record(row, gradient);

        let n = self.memory.n_covered();
        let scale = beta.scale_factor();
        self.record_step(iteration, step_size / n, step_size / (n * scale));
        self.last_iteration = Some(iteration);

        let sum = &self.memory.sum;
        let fit_intercept = beta.fit_intercept();
        beta.update(|c, f, _| -step_size * sum[[c, f]] / n, fit_intercept, row);
    }

    fn lazy_update<W: WeightMatrix>(
        &mut self,
        beta: &mut W,
        row: &R,
        last_visited: &mut [usize],
        iteration: usize,
    ) {
        check_matrix(beta, &self.memory);
        self.check_last_visited(last_visited);

        if iteration > 0 {
            let scale = beta.scale_factor();
            let fit_intercept = beta.fit_intercept();
            let visited: &[usize] = last_visited;
            beta.update(
                |c, f, _| self.pending(c, f, visited[f], iteration - 1, scale),
                fit_intercept,
                row,
            );
        }

        for (feature, _) in row.features() {
            last_visited[feature] = iteration;
        }
    }

    fn reset_jit_system<W: WeightMatrix>(&mut self, beta: &mut W, last_visited: &mut [usize]) {
        check_matrix(beta, &self.memory);
        self.check_last_visited(last_visited);
        let Some(last) = self.last_iteration else {
            return;
        };

        let scale = beta.scale_factor();
        let fit_intercept = beta.fit_intercept();
        let visited: &[usize] = last_visited;
        beta.update_all(
            |c, f| self.pending(c, f, visited[f], last, scale),
            fit_intercept,
        );

        last_visited.fill(last);
        self.plain.clear();
        self.decayed.clear();
        self.window_start = last + 1;
        beta.normalize();
    }
}

/// Builds [`LazySagUpdater`]s.
#[derive(Debug, Clone, Copy)]
pub struct LazySagUpdaterFactory {
    n_rows: usize,
    n_features: usize,
    n_categories: usize,
}

impl LazySagUpdaterFactory {
    pub fn new(n_rows: usize, n_features: usize, n_categories: usize) -> Self {
        Self {
            n_rows,
            n_features,
            n_categories,
        }
    }
}

impl<R: TrainingRow> UpdaterFactory<R> for LazySagUpdaterFactory {
    type Updater = LazySagUpdater;

    fn create(&self) -> LazySagUpdater {
        LazySagUpdater::new(self.n_rows, self.n_features, self.n_categories)
    }
}
