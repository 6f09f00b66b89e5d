use serde::{Deserialize, Serialize};
use subsim_core::{RngHandle, StandardNormal, SubsimError};

use crate::config::ProposalConfig;

/// Kind of proposal used to grow chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Conditional sampling (subset-infinity).
    ConditionalSampling,
    /// Adaptive conditional sampling.
    AdaptiveConditionalSampling,
    /// Component-wise modified Metropolis.
    ModifiedMetropolis,
}

impl ProposalKind {
    /// Short label used in logs and level tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalKind::ConditionalSampling => "cs",
            ProposalKind::AdaptiveConditionalSampling => "acs",
            ProposalKind::ModifiedMetropolis => "mma",
        }
    }
}

impl From<&ProposalConfig> for ProposalKind {
    fn from(config: &ProposalConfig) -> Self {
        match config {
            ProposalConfig::ConditionalSampling { .. } => ProposalKind::ConditionalSampling,
            ProposalConfig::AdaptiveConditionalSampling { .. } => {
                ProposalKind::AdaptiveConditionalSampling
            }
            ProposalConfig::ModifiedMetropolis { .. } => ProposalKind::ModifiedMetropolis,
        }
    }
}

/// Candidate generator for one Markov chain step.
///
/// Every variant leaves the standard normal distribution invariant when its
/// candidates are accepted unconditionally. Acceptance against the level
/// threshold happens in [`crate::chain::Chain::step`], not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkovChainProposal {
    /// `x' = rho * x + sigma * z` with a fixed `sigma`.
    ConditionalSampling {
        /// Proposal standard deviation in `(0, 1]`.
        sigma: f64,
    },
    /// Conditional sampling with `sigma = min(1, lambda * base_std)`.
    AdaptiveConditionalSampling {
        /// Base spread scaled by `lambda`.
        base_std: f64,
        /// Current scale parameter owned by the adapter.
        lambda: f64,
    },
    /// Per-component random walk accepted against the standard normal marginal.
    ModifiedMetropolis {
        /// Standard deviation of the component random walk.
        spread: f64,
        /// Target marginal of every component.
        marginal: StandardNormal,
    },
}

impl MarkovChainProposal {
    /// Builds the proposal described by `config` for the given `lambda`.
    ///
    /// `lambda` is ignored by the non-adaptive variants.
    pub fn from_config(config: &ProposalConfig, lambda: f64) -> Result<Self, SubsimError> {
        let proposal = match config {
            ProposalConfig::ConditionalSampling { std } => {
                MarkovChainProposal::ConditionalSampling { sigma: *std }
            }
            ProposalConfig::AdaptiveConditionalSampling { std, .. } => {
                MarkovChainProposal::AdaptiveConditionalSampling {
                    base_std: *std,
                    lambda,
                }
            }
            ProposalConfig::ModifiedMetropolis { spread } => {
                return MarkovChainProposal::modified_metropolis(*spread);
            }
        };
        Ok(proposal)
    }

    /// Component-wise Metropolis walk with the given spread.
    pub fn modified_metropolis(spread: f64) -> Result<Self, SubsimError> {
        Ok(MarkovChainProposal::ModifiedMetropolis {
            spread,
            marginal: StandardNormal::new()?,
        })
    }

    /// Kind tag of the proposal.
    pub fn kind(&self) -> ProposalKind {
        match self {
            MarkovChainProposal::ConditionalSampling { .. } => ProposalKind::ConditionalSampling,
            MarkovChainProposal::AdaptiveConditionalSampling { .. } => {
                ProposalKind::AdaptiveConditionalSampling
            }
            MarkovChainProposal::ModifiedMetropolis { .. } => ProposalKind::ModifiedMetropolis,
        }
    }

    /// Effective conditional-sampling spread, `None` for the Metropolis variant.
    pub fn sigma(&self) -> Option<f64> {
        match self {
            MarkovChainProposal::ConditionalSampling { sigma } => Some(*sigma),
            MarkovChainProposal::AdaptiveConditionalSampling { base_std, lambda } => {
                Some((lambda * base_std).min(1.0))
            }
            MarkovChainProposal::ModifiedMetropolis { .. } => None,
        }
    }

    /// Generates a candidate state from `current`.
    pub fn propose(&self, current: &[f64], rng: &mut RngHandle) -> Vec<f64> {
        match *self {
            MarkovChainProposal::ConditionalSampling { sigma } => {
                conditional_sample(current, sigma, rng)
            }
            MarkovChainProposal::AdaptiveConditionalSampling { base_std, lambda } => {
                conditional_sample(current, (lambda * base_std).min(1.0), rng)
            }
            MarkovChainProposal::ModifiedMetropolis { spread, marginal } => {
                modified_metropolis(current, spread, &marginal, rng)
            }
        }
    }
}

fn conditional_sample(current: &[f64], sigma: f64, rng: &mut RngHandle) -> Vec<f64> {
    let rho = (1.0 - sigma * sigma).max(0.0).sqrt();
    current
        .iter()
        .map(|&x| rho * x + sigma * rng.standard_normal())
        .collect()
}

fn modified_metropolis(
    current: &[f64],
    spread: f64,
    marginal: &StandardNormal,
    rng: &mut RngHandle,
) -> Vec<f64> {
    current
        .iter()
        .enumerate()
        .map(|(component, &x)| {
            let trial = x + spread * rng.standard_normal();
            let draw = rng.uniform();
            let density = marginal.pdf(x);
            if density <= 0.0 {
                tracing::warn!(
                    component,
                    value = x,
                    "zero marginal density at current state, component rejected"
                );
                return x;
            }
            let ratio = marginal.pdf(trial) / density;
            if draw < ratio.min(1.0) {
                trial
            } else {
                x
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moments(values: &[f64]) -> (f64, f64) {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        (mean, var)
    }

    #[test]
    fn adaptive_sigma_is_capped_at_one() {
        let proposal = MarkovChainProposal::AdaptiveConditionalSampling {
            base_std: 0.5,
            lambda: 4.0,
        };
        assert_eq!(proposal.sigma(), Some(1.0));
        let proposal = MarkovChainProposal::AdaptiveConditionalSampling {
            base_std: 0.5,
            lambda: 0.6,
        };
        assert!((proposal.sigma().unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn unit_sigma_ignores_current_state() {
        let proposal = MarkovChainProposal::ConditionalSampling { sigma: 1.0 };
        let mut rng_a = RngHandle::from_seed(3);
        let mut rng_b = RngHandle::from_seed(3);
        let a = proposal.propose(&[100.0, -100.0], &mut rng_a);
        let b = proposal.propose(&[0.0, 0.0], &mut rng_b);
        assert_eq!(a, b);
    }

    #[test]
    fn modified_metropolis_preserves_standard_normal() {
        let proposal = MarkovChainProposal::modified_metropolis(1.0).unwrap();
        let mut rng = RngHandle::from_seed(21);
        let mut state = vec![0.0, 0.0];
        let mut visited = Vec::with_capacity(20_000);
        for _ in 0..20_000 {
            state = proposal.propose(&state, &mut rng);
            visited.push(state[1]);
        }
        let (mean, var) = moments(&visited);
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((var - 1.0).abs() < 0.15, "variance {var}");
    }

    #[test]
    fn zero_density_component_is_never_moved() {
        let proposal = MarkovChainProposal::modified_metropolis(1.0).unwrap();
        let mut rng = RngHandle::from_seed(8);
        for _ in 0..50 {
            let candidate = proposal.propose(&[1.0e3, 0.0], &mut rng);
            assert_eq!(candidate[0], 1.0e3);
        }
    }

    #[test]
    fn kinds_follow_config() {
        let cs = MarkovChainProposal::from_config(&ProposalConfig::default(), 9.0).unwrap();
        assert_eq!(cs.kind(), ProposalKind::ConditionalSampling);
        assert_eq!(cs.kind().as_str(), "cs");
        let mma = MarkovChainProposal::from_config(
            &ProposalConfig::ModifiedMetropolis { spread: 1.0 },
            1.0,
        )
        .unwrap();
        assert_eq!(mma.sigma(), None);
        let config = ProposalConfig::ModifiedMetropolis { spread: 1.0 };
        assert_eq!(mma.kind(), ProposalKind::from(&config));
    }
}
