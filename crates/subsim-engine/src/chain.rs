use serde::{Deserialize, Serialize};
use subsim_core::{PerformanceFunction, RngHandle, SubsimError};

use crate::proposal::MarkovChainProposal;

/// One step of a Markov chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// State held by the chain after the step.
    pub state: Vec<f64>,
    /// Performance value of `state`.
    pub g: f64,
    /// Whether the step moved to a fresh candidate.
    pub accepted: bool,
}

/// Append-only history of a single Markov chain.
///
/// The first entry is the seed and counts as accepted. Every later entry is
/// either the accepted candidate or a copy of the previous entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    entries: Vec<ChainEntry>,
}

impl Chain {
    /// Starts a chain from a seed of the previous level.
    pub fn from_seed(state: Vec<f64>, g: f64) -> Self {
        Self {
            entries: vec![ChainEntry {
                state,
                g,
                accepted: true,
            }],
        }
    }

    /// Appends one step: the candidate when `g > threshold`, otherwise a copy
    /// of the current entry. Returns whether the candidate was accepted.
    pub fn step(&mut self, candidate: Vec<f64>, g: f64, threshold: f64) -> bool {
        let entry = if g > threshold {
            ChainEntry {
                state: candidate,
                g,
                accepted: true,
            }
        } else {
            let current = self.current();
            ChainEntry {
                state: current.state.clone(),
                g: current.g,
                accepted: false,
            }
        };
        let accepted = entry.accepted;
        self.entries.push(entry);
        accepted
    }

    /// Latest entry of the chain.
    pub fn current(&self) -> &ChainEntry {
        // A chain always holds at least its seed.
        &self.entries[self.entries.len() - 1]
    }

    /// Number of states, seed included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a chain holds at least its seed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full history in step order.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Acceptance flags of the steps taken after the seed.
    pub fn acceptance_flags(&self) -> Vec<bool> {
        self.entries.iter().skip(1).map(|entry| entry.accepted).collect()
    }

    /// Performance values in step order.
    pub fn evaluations(&self) -> Vec<f64> {
        self.entries.iter().map(|entry| entry.g).collect()
    }

    /// Splits the chain into its states and performance values.
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<f64>) {
        self.entries
            .into_iter()
            .map(|entry| (entry.state, entry.g))
            .unzip()
    }
}

/// Grows a chain from its seed until it holds `target_len` states.
///
/// Each step draws one candidate from `proposal`, evaluates it exactly once and
/// applies the threshold acceptance rule. Evaluation errors abort the chain and
/// are returned unchanged.
pub fn grow_chain<F>(
    seed: Vec<f64>,
    seed_g: f64,
    target_len: usize,
    threshold: f64,
    proposal: &MarkovChainProposal,
    evaluator: &F,
    rng: &mut RngHandle,
) -> Result<Chain, SubsimError>
where
    F: PerformanceFunction + ?Sized,
{
    let mut chain = Chain::from_seed(seed, seed_g);
    while chain.len() < target_len {
        let candidate = proposal.propose(&chain.current().state, rng);
        let g = evaluator.evaluate(&candidate)?;
        chain.step(candidate, g, threshold);
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_steps_duplicate_previous_state() {
        let mut chain = Chain::from_seed(vec![1.0, 1.0], 0.5);
        assert!(chain.step(vec![2.0, 2.0], 0.9, 0.4));
        assert!(!chain.step(vec![3.0, 3.0], 0.1, 0.4));
        assert!(!chain.step(vec![4.0, 4.0], 0.4, 0.4));

        let states: Vec<_> = chain.entries().iter().map(|e| e.state.clone()).collect();
        assert_eq!(
            states,
            vec![
                vec![1.0, 1.0],
                vec![2.0, 2.0],
                vec![2.0, 2.0],
                vec![2.0, 2.0]
            ]
        );
        assert_eq!(chain.evaluations(), vec![0.5, 0.9, 0.9, 0.9]);
        assert_eq!(chain.acceptance_flags(), vec![true, false, false]);
        assert!(chain.entries()[0].accepted);
    }

    #[test]
    fn grow_stops_at_target_length() {
        let evaluator = |x: &[f64]| -> Result<f64, SubsimError> { Ok(x[0]) };
        let proposal = MarkovChainProposal::ConditionalSampling { sigma: 0.5 };
        let mut rng = RngHandle::from_seed(1);
        let chain = grow_chain(
            vec![0.0],
            0.0,
            7,
            f64::NEG_INFINITY,
            &proposal,
            &evaluator,
            &mut rng,
        )
        .unwrap();
        assert_eq!(chain.len(), 7);
        assert!(chain.acceptance_flags().iter().all(|&flag| flag));
    }
}
