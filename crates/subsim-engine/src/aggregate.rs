//! Level probabilities, their coefficients of variation and the running
//! failure probability estimate.

use serde::{Deserialize, Serialize};

/// Statistics of one level population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    /// Fraction of the population above the (clamped) threshold.
    pub level_pf: f64,
    /// Coefficient of variation of `level_pf`.
    pub cov: f64,
    /// Correlation factor of the chains, zero for iid samples.
    pub gamma: f64,
}

/// `mean(g > min(threshold, 0))`.
pub fn exceedance_probability(evaluations: &[f64], threshold: f64) -> f64 {
    if evaluations.is_empty() {
        return 0.0;
    }
    let boundary = threshold.min(0.0);
    let exceeding = evaluations.iter().filter(|&&g| g > boundary).count();
    exceeding as f64 / evaluations.len() as f64
}

/// COV of a probability estimated from `n` independent samples.
pub fn iid_cov(p: f64, n: usize) -> f64 {
    if p <= 0.0 || n == 0 {
        return f64::INFINITY;
    }
    ((1.0 - p) / (n as f64 * p)).sqrt()
}

/// Statistics of the direct Monte Carlo level with probability `level_pf`.
pub fn direct_level_statistics(num_samples: usize, level_pf: f64) -> LevelStatistics {
    LevelStatistics {
        level_pf,
        cov: iid_cov(level_pf, num_samples),
        gamma: 0.0,
    }
}

/// Au & Beck correlation factor `gamma` of a chain-structured level.
///
/// `indicators[j][t]` tells whether state `t` of chain `j` exceeds the
/// threshold; every chain must have the same length.
pub fn correlation_factor(indicators: &[Vec<bool>], p: f64) -> f64 {
    let num_chains = indicators.len();
    let states_per_chain = indicators.first().map(Vec::len).unwrap_or(0);
    let n = num_chains * states_per_chain;
    let variance = p * (1.0 - p);
    if n == 0 || variance <= 0.0 {
        return 0.0;
    }

    let mut gamma = 0.0;
    for lag in 1..states_per_chain {
        let mut joint = 0usize;
        for chain in indicators {
            joint += chain
                .iter()
                .zip(chain.iter().skip(lag))
                .filter(|(&a, &b)| a && b)
                .count();
        }
        let pairs = (n - lag * num_chains) as f64;
        let covariance = joint as f64 / pairs - p * p;
        let rho = covariance / variance;
        gamma += 2.0 * (1.0 - (lag * num_chains) as f64 / n as f64) * rho;
    }
    gamma
}

/// Statistics of a level grown from Markov chains.
///
/// `chain_evaluations[j]` holds the performance values of chain `j` in step
/// order. Indicators are taken against `min(threshold, 0)`; `level_pf` is the
/// conditional probability recorded for the level.
pub fn chain_level_statistics(
    chain_evaluations: &[Vec<f64>],
    threshold: f64,
    level_pf: f64,
) -> LevelStatistics {
    let boundary = threshold.min(0.0);
    let indicators: Vec<Vec<bool>> = chain_evaluations
        .iter()
        .map(|chain| chain.iter().map(|&g| g > boundary).collect())
        .collect();
    let n: usize = indicators.iter().map(Vec::len).sum();
    let gamma = correlation_factor(&indicators, level_pf);
    let cov = if level_pf <= 0.0 || n == 0 {
        f64::INFINITY
    } else {
        ((1.0 - level_pf) / (level_pf * n as f64) * (1.0 + gamma)).sqrt()
    };
    LevelStatistics {
        level_pf,
        cov,
        gamma,
    }
}

/// Running estimate `p0^level * exceeding / num_samples` after `level`.
///
/// `exceeding` is the seed count on intermediate levels and the number of
/// failed samples on the terminal one.
pub fn level_failure_probability(
    p0: f64,
    level: usize,
    exceeding: usize,
    num_samples: usize,
) -> f64 {
    if num_samples == 0 {
        return 0.0;
    }
    p0.powi(level as i32) * exceeding as f64 / num_samples as f64
}

/// Aggregate COV assuming uncorrelated levels, with the fully correlated
/// upper bound.
pub fn aggregate_cov(level_covs: &[f64]) -> (f64, f64) {
    let uncorrelated = level_covs.iter().map(|c| c * c).sum::<f64>().sqrt();
    let upper = level_covs.iter().sum();
    (uncorrelated, upper)
}
