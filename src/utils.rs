//! Common utilities used across the crate.
//!
//! This module provides the parallelism switch and the small numeric helpers
//! that the training loop and its evaluation share.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// This is a simple flag passed through training components. When `Parallel`,
/// read-only evaluation passes (such as the per-epoch loss) may use `rayon`
/// parallel iterators. Weight updates are always sequential.
///
/// The thread pool itself is set up by the caller via [`run_with_threads`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over a slice and sum the results, in parallel if allowed.
    #[inline]
    pub fn maybe_par_sum<T, F>(self, items: &[T], f: F) -> f64
    where
        T: Sync,
        F: Fn(&T) -> f64 + Sync + Send,
    {
        if self.is_parallel() {
            items.par_iter().map(f).sum()
        } else {
            items.iter().map(f).sum()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// Falls back to sequential execution if the pool cannot be built.
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    log::warn!("failed to build thread pool ({err}), running sequentially");
                    f(Parallelism::Sequential)
                }
            }
        }
    }
}

// =============================================================================
// Numeric Helpers
// =============================================================================

/// Numerically stable `ln(Σ exp(x_i))` with an implicit extra zero term.
///
/// The implicit zero is the logit of the reference category.
#[inline]
pub fn log_sum_exp_with_zero(logits: &[f64]) -> f64 {
    let max = logits.iter().copied().fold(0.0f64, f64::max);
    let sum: f64 = (-max).exp() + logits.iter().map(|&v| (v - max).exp()).sum::<f64>();
    max + sum.ln()
}
