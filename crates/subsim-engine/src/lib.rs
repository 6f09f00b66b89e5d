#![deny(missing_docs)]

//! Subset simulation estimator for small failure probabilities.
//!
//! A run starts with a direct Monte Carlo population in standard-normal
//! space, then repeatedly selects the most critical samples as seeds and grows
//! Markov chains restricted to the next intermediate domain until the failure
//! domain `g > 0` is reached. Evaluations are dispatched on a rayon pool and
//! every random draw comes from a substream derived from the master seed, so
//! results are independent of the worker count.

/// Proposal scale adaptation for the adaptive conditional sampler.
pub mod adapter;
/// Level probabilities, coefficients of variation and the global estimate.
pub mod aggregate;
/// Markov chain accumulator and growth.
pub mod chain;
/// Level-boundary checkpoint payloads.
pub mod checkpoint;
/// YAML configuration schema and validation.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Direct Monte Carlo sampling in standard-normal space.
pub mod direct;
/// Level controller and public `run`/`resume` entry points.
pub mod kernel;
/// Reference performance functions with closed-form failure probabilities.
pub mod limit_state;
/// Run manifest serialization helpers.
pub mod manifest;
/// Level table export.
pub mod metrics;
/// Markov chain proposal distributions.
pub mod proposal;
/// Intermediate threshold and seed selection.
pub mod threshold;

pub use config::{
    CheckpointConfig, LevelPlan, OutputConfig, ProposalConfig, RunConfig, SeedPolicy,
};
pub use kernel::{resume, run, LevelRecord, Phase, RunSummary, SubsetSimulation};
pub use limit_state::{LimitStateConfig, LinearLimitState};
pub use proposal::{MarkovChainProposal, ProposalKind};
pub use threshold::{select_threshold, ThresholdSelection};
