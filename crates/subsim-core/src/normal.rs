//! Standard normal distribution used in standard-normal space.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::errors::{ErrorInfo, SubsimError};

/// Standard normal marginal `N(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardNormal {
    dist: Normal,
}

impl StandardNormal {
    /// Builds the unit normal distribution.
    pub fn new() -> Result<Self, SubsimError> {
        let dist = Normal::new(0.0, 1.0).map_err(|err| {
            SubsimError::Numerical(ErrorInfo::new("standard-normal", err.to_string()))
        })?;
        Ok(Self { dist })
    }

    /// Density at `x`.
    pub fn pdf(&self, x: f64) -> f64 {
        self.dist.pdf(x)
    }

    /// Cumulative distribution function at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        self.dist.cdf(x)
    }

    /// Upper tail probability `P(Z > x)`.
    pub fn survival(&self, x: f64) -> f64 {
        self.dist.sf(x)
    }

    /// Inverse of [`StandardNormal::cdf`] for probabilities strictly inside `(0, 1)`.
    pub fn quantile(&self, p: f64) -> Result<f64, SubsimError> {
        if !(p > 0.0 && p < 1.0) {
            return Err(SubsimError::Numerical(
                ErrorInfo::new("quantile-domain", "probability must lie strictly inside (0, 1)")
                    .with_context("p", p),
            ));
        }
        Ok(self.dist.inverse_cdf(p))
    }
}
