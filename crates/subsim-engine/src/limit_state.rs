//! Reference performance functions with closed-form failure probabilities.

use serde::{Deserialize, Serialize};
use subsim_core::errors::ErrorInfo;
use subsim_core::{PerformanceFunction, StandardNormal, SubsimError};

/// Reference limit state selected from a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LimitStateConfig {
    /// Sum of all inputs shifted so that `P(g > 0) = target_pf`.
    NormalSum {
        /// Input dimension.
        dimension: usize,
        /// Exact failure probability of the limit state.
        target_pf: f64,
    },
    /// Hyperplane `w . x - offset`.
    Linear {
        /// Normal vector of the hyperplane.
        weights: Vec<f64>,
        /// Distance term subtracted from the projection.
        offset: f64,
    },
}

impl LimitStateConfig {
    /// Builds the performance function described by the configuration.
    pub fn build(&self) -> Result<LinearLimitState, SubsimError> {
        match self {
            LimitStateConfig::NormalSum {
                dimension,
                target_pf,
            } => LinearLimitState::normal_sum(*dimension, *target_pf),
            LimitStateConfig::Linear { weights, offset } => {
                LinearLimitState::new(weights.clone(), *offset)
            }
        }
    }
}

/// `g(x) = w . x - offset`; failure probability `Q(offset / |w|)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearLimitState {
    weights: Vec<f64>,
    offset: f64,
    marginal: StandardNormal,
}

impl LinearLimitState {
    /// Creates a hyperplane limit state with non-zero weights.
    pub fn new(weights: Vec<f64>, offset: f64) -> Result<Self, SubsimError> {
        let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        if weights.is_empty() || !norm.is_finite() || norm == 0.0 || !offset.is_finite() {
            return Err(SubsimError::Config(
                ErrorInfo::new("limit-state-weights", "weights must be finite and not all zero")
                    .with_context("dimension", weights.len()),
            ));
        }
        Ok(Self {
            weights,
            offset,
            marginal: StandardNormal::new()?,
        })
    }

    /// `sum(x) - sqrt(d) * quantile(1 - target_pf)`.
    pub fn normal_sum(dimension: usize, target_pf: f64) -> Result<Self, SubsimError> {
        if dimension == 0 {
            return Err(SubsimError::config(
                "limit-state-dimension",
                "dimension must be positive",
            ));
        }
        if !(target_pf > 0.0 && target_pf < 1.0) {
            return Err(SubsimError::Config(
                ErrorInfo::new("limit-state-target", "target_pf must lie in (0, 1)")
                    .with_context("target_pf", target_pf),
            ));
        }
        let marginal = StandardNormal::new()?;
        let offset = (dimension as f64).sqrt() * marginal.quantile(1.0 - target_pf)?;
        Self::new(vec![1.0; dimension], offset)
    }

    /// Input dimension expected by `evaluate`.
    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    /// Closed-form failure probability.
    pub fn exact_failure_probability(&self) -> f64 {
        let norm = self.weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        self.marginal.survival(self.offset / norm)
    }
}

impl PerformanceFunction for LinearLimitState {
    fn evaluate(&self, x: &[f64]) -> Result<f64, SubsimError> {
        if x.len() != self.weights.len() {
            return Err(SubsimError::Evaluation(
                ErrorInfo::new("dimension-mismatch", "sample dimension differs from weights")
                    .with_context("expected", self.weights.len())
                    .with_context("actual", x.len()),
            ));
        }
        let projection: f64 = self.weights.iter().zip(x).map(|(w, xi)| w * xi).sum();
        Ok(projection - self.offset)
    }
}
