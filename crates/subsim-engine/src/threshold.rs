use serde::{Deserialize, Serialize};
use subsim_core::errors::ErrorInfo;
use subsim_core::{Population, SubsimError};

use crate::config::seed_count;

/// Threshold and seeds selected from a level population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelection {
    /// Midpoint between the `k`-th largest performance value and the next
    /// strictly smaller one.
    pub threshold: f64,
    /// The `k` most critical samples, most critical first.
    pub seeds: Vec<Vec<f64>>,
    /// Performance values of `seeds`.
    pub seed_evaluations: Vec<f64>,
    /// Samples with `g > 0` in the population.
    pub num_failed: usize,
    /// Size of the population.
    pub num_samples: usize,
}

impl ThresholdSelection {
    /// Whether the selected threshold lies on or beyond the failure boundary.
    pub fn reaches_failure_domain(&self) -> bool {
        self.threshold >= 0.0
    }

    /// Whether every seed lies strictly inside `{g > threshold}`.
    ///
    /// Only fails when no value below the `k`-th largest exists.
    pub fn seeds_exceed_threshold(&self) -> bool {
        self.seed_evaluations.iter().all(|&g| g > self.threshold)
    }
}

/// Indices of `evaluations` ordered from most to least critical.
///
/// Ties keep their original order.
pub fn descending_order(evaluations: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..evaluations.len()).collect();
    order.sort_by(|&a, &b| evaluations[b].total_cmp(&evaluations[a]));
    order
}

/// Selects the intermediate threshold and the seeds of the next level.
///
/// Values tied with the `k`-th largest stay above the threshold: the midpoint
/// is taken with the first strictly smaller value, so every seed satisfies
/// `g > threshold`. Without ties this is the midpoint of ranks `k` and `k + 1`.
pub fn select_threshold(population: &Population, p0: f64) -> Result<ThresholdSelection, SubsimError> {
    let num_samples = population.len();
    let k = seed_count(num_samples, p0)?;
    let evaluations = population.evaluations();
    let order = descending_order(evaluations);

    let upper = evaluations[order[k - 1]];
    let lower = order[k..]
        .iter()
        .map(|&index| evaluations[index])
        .find(|&g| g < upper);
    let threshold = match lower {
        Some(lower) => {
            let midpoint = 0.5 * (upper + lower);
            // adjacent floats can round the midpoint onto `upper`
            if midpoint < upper || !midpoint.is_finite() {
                midpoint
            } else {
                lower
            }
        }
        None => upper,
    };
    if !threshold.is_finite() {
        return Err(SubsimError::Numerical(
            ErrorInfo::new("threshold-non-finite", "selected threshold is not finite")
                .with_context("upper", upper)
                .with_context("lower", lower.unwrap_or(upper))
                .with_hint("check the performance function for NaN or infinite values"),
        ));
    }

    let seeds = order[..k]
        .iter()
        .map(|&index| population.samples()[index].clone())
        .collect();
    let seed_evaluations = order[..k].iter().map(|&index| evaluations[index]).collect();

    Ok(ThresholdSelection {
        threshold,
        seeds,
        seed_evaluations,
        num_failed: population.num_failed(),
        num_samples,
    })
}
