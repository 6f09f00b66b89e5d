use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SubsimError};

/// Samples in standard-normal space paired with their performance values.
///
/// Entry `i` of `evaluations` is `g(samples[i])`. Both vectors always have the
/// same length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Population {
    samples: Vec<Vec<f64>>,
    evaluations: Vec<f64>,
}

impl Population {
    /// Builds a population, rejecting mismatched lengths or ragged samples.
    pub fn new(samples: Vec<Vec<f64>>, evaluations: Vec<f64>) -> Result<Self, SubsimError> {
        if samples.len() != evaluations.len() {
            return Err(SubsimError::Numerical(
                ErrorInfo::new(
                    "population-length",
                    "sample and evaluation counts differ",
                )
                .with_context("samples", samples.len())
                .with_context("evaluations", evaluations.len()),
            ));
        }
        if let Some(first) = samples.first() {
            let dimension = first.len();
            if let Some(index) = samples.iter().position(|x| x.len() != dimension) {
                return Err(SubsimError::Numerical(
                    ErrorInfo::new("population-ragged", "samples have differing dimensions")
                        .with_context("index", index)
                        .with_context("expected", dimension),
                ));
            }
        }
        Ok(Self {
            samples,
            evaluations,
        })
    }

    /// Number of samples in the population.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true when the population holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample vectors in population order.
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    /// Performance values in population order.
    pub fn evaluations(&self) -> &[f64] {
        &self.evaluations
    }

    /// Number of samples inside the true failure domain (`g > 0`).
    pub fn num_failed(&self) -> usize {
        self.evaluations.iter().filter(|&&g| g > 0.0).count()
    }
}
