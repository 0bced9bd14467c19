//! High-level SAG configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use sagreg::model::SagConfig;
//! use sagreg::training::sag::{LearningRateKind, Prior, UpdaterKind};
//!
//! // All defaults
//! let config = SagConfig::builder().build().unwrap();
//! assert_eq!(config.max_epochs, 100);
//!
//! let config = SagConfig::builder()
//!     .max_epochs(50)
//!     .learning_rate(LearningRateKind::LineSearch)
//!     .prior(Prior::gauss(10.0))
//!     .updater(UpdaterKind::Eager)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

use crate::training::Verbosity;
use crate::training::sag::{LearningRateKind, Prior, SagParams, UpdaterKind};
use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_epochs must be at least 1")]
    InvalidMaxEpochs,

    #[error("epsilon must be finite and non-negative, got {0}")]
    InvalidEpsilon(f64),

    #[error("learning rate must be finite and positive, got {0}")]
    InvalidLearningRate(f64),

    #[error("learning rate decay must be finite and non-negative, got {0}")]
    InvalidDecay(f64),

    #[error("prior variance must be finite and positive, got {0}")]
    InvalidVariance(f64),
}

// =============================================================================
// SagConfig
// =============================================================================

/// Configuration for SAG model training.
///
/// The builder (via `bon`) validates at build time.
#[derive(Debug, Clone, PartialEq, Builder, serde::Serialize, serde::Deserialize)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct SagConfig {
    /// Maximum number of epochs. Default: 100.
    #[builder(default = 100)]
    pub max_epochs: usize,

    /// Relative coefficient change below which training stops. Default: 1e-5.
    #[builder(default = 1e-5)]
    pub epsilon: f64,

    /// Default: `Lazy`.
    #[builder(default)]
    pub updater: UpdaterKind,

    /// Default: fixed rate of 0.1.
    #[builder(default)]
    pub learning_rate: LearningRateKind,

    /// Default: `Uniform` (no regularization).
    #[builder(default)]
    pub prior: Prior,

    /// Default: true.
    #[builder(default = true)]
    pub fit_intercept: bool,

    /// Seed for the row shuffle. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,

    /// Threads for loss evaluation: 0 = auto, 1 = sequential, >1 = exact count.
    /// Default: 1.
    #[builder(default = 1)]
    pub n_threads: usize,
}

/// Custom finishing function that validates the config.
impl<S: sag_config_builder::IsComplete> SagConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `max_epochs == 0`
    /// - negative or non-finite `epsilon`
    /// - non-positive learning rate or negative annealing decay
    /// - non-positive Gauss prior variance
    pub fn build(self) -> Result<SagConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl SagConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_epochs == 0 {
            return Err(ConfigError::InvalidMaxEpochs);
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }

        match self.learning_rate {
            LearningRateKind::Fixed(rate) => check_rate(rate)?,
            LearningRateKind::Annealing { initial, decay } => {
                check_rate(initial)?;
                if !decay.is_finite() || decay < 0.0 {
                    return Err(ConfigError::InvalidDecay(decay));
                }
            }
            LearningRateKind::LineSearch => {}
        }

        if let Prior::Gauss { variance } = self.prior {
            if !variance.is_finite() || variance <= 0.0 {
                return Err(ConfigError::InvalidVariance(variance));
            }
        }

        Ok(())
    }

    /// Convert to the trainer's parameters.
    pub fn to_trainer_params(&self, parallelism: Parallelism) -> SagParams {
        SagParams {
            max_epochs: self.max_epochs,
            epsilon: self.epsilon,
            updater: self.updater,
            learning_rate: self.learning_rate,
            prior: self.prior,
            fit_intercept: self.fit_intercept,
            seed: self.seed,
            verbosity: self.verbosity,
            parallelism,
        }
    }
}

fn check_rate(rate: f64) -> Result<(), ConfigError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidLearningRate(rate))
    }
}

impl Default for SagConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
