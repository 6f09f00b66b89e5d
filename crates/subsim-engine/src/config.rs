use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use subsim_core::errors::ErrorInfo;
use subsim_core::SubsimError;

/// Tolerance used when checking that `samples_per_level * p0` is an integer.
const INTEGER_TOLERANCE: f64 = 1e-9;

/// YAML-configurable parameters governing a subset simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Dimension of the standard-normal input space.
    pub dimension: usize,
    /// Conditional probability targeted at every intermediate level.
    #[serde(default = "default_p0")]
    pub p0: f64,
    /// Number of samples generated per level (direct Monte Carlo included).
    pub samples_per_level: usize,
    /// Markov chain proposal used to grow the chains of every level.
    #[serde(default)]
    pub proposal: ProposalConfig,
    /// Upper bound on the number of levels before the run is abandoned.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    /// Number of worker threads used for performance function evaluations.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_p0() -> f64 {
    0.1
}

fn default_max_levels() -> usize {
    32
}

fn default_concurrency() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dimension: 2,
            p0: default_p0(),
            samples_per_level: 1000,
            proposal: ProposalConfig::default(),
            max_levels: default_max_levels(),
            concurrency: default_concurrency(),
            seed_policy: SeedPolicy::default(),
            checkpoint: CheckpointConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Supported Markov chain proposal strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProposalConfig {
    /// Conditional sampling with a fixed proposal standard deviation.
    ConditionalSampling {
        /// Proposal standard deviation in `(0, 1]`.
        #[serde(default = "default_proposal_std")]
        std: f64,
    },
    /// Conditional sampling whose spread is scaled by an adapted `lambda`.
    AdaptiveConditionalSampling {
        /// Base proposal spread multiplied by `lambda`.
        #[serde(default = "default_proposal_std")]
        std: f64,
        /// Scale parameter at the start of the run.
        #[serde(default = "default_initial_lambda")]
        initial_lambda: f64,
        /// Chains grown between two adaptation steps (all chains when absent).
        #[serde(default)]
        chains_per_adaptation: Option<usize>,
    },
    /// Component-wise modified Metropolis algorithm.
    ModifiedMetropolis {
        /// Standard deviation of the per-component random walk.
        #[serde(default = "default_mma_spread")]
        spread: f64,
    },
}

fn default_proposal_std() -> f64 {
    0.8
}

fn default_initial_lambda() -> f64 {
    0.6
}

fn default_mma_spread() -> f64 {
    1.0
}

impl Default for ProposalConfig {
    fn default() -> Self {
        ProposalConfig::ConditionalSampling {
            std: default_proposal_std(),
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Interval in levels between checkpoint writes (0 disables checkpoints).
    #[serde(default)]
    pub interval: usize,
    /// Maximum number of checkpoints to retain.
    #[serde(default = "default_checkpoint_retention")]
    pub max_to_keep: usize,
}

fn default_checkpoint_retention() -> usize {
    4
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            max_to_keep: default_checkpoint_retention(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Level table filename relative to `run_directory`.
    #[serde(default = "default_levels_filename")]
    pub levels_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Subdirectory used for checkpoint files.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
}

fn default_levels_filename() -> PathBuf {
    PathBuf::from("levels.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            levels_file: default_levels_filename(),
            manifest_file: default_manifest_filename(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}

/// Chain layout derived from a validated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPlan {
    /// Seeds (and therefore chains) carried from one level to the next.
    pub num_chains: usize,
    /// States held by every chain once a level is complete, seed included.
    pub states_per_chain: usize,
    /// Chains grown between two proposal adaptations.
    pub chains_per_adaptation: usize,
}

impl RunConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, SubsimError> {
        serde_yaml::from_str(text)
            .map_err(|err| SubsimError::Config(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Checks every precondition of a run and derives the chain layout.
    pub fn validate(&self) -> Result<LevelPlan, SubsimError> {
        if self.dimension == 0 {
            return Err(SubsimError::Config(
                ErrorInfo::new("dimension", "dimension must be positive")
                    .with_context("dimension", self.dimension),
            ));
        }
        if !(self.p0 > 0.0 && self.p0 < 1.0) {
            return Err(SubsimError::Config(
                ErrorInfo::new("p0-range", "p0 must lie strictly inside (0, 1)")
                    .with_context("p0", self.p0)
                    .with_hint("0.1 is the usual choice"),
            ));
        }
        if self.samples_per_level == 0 {
            return Err(SubsimError::config(
                "samples-per-level",
                "samples_per_level must be positive",
            ));
        }
        if self.max_levels == 0 {
            return Err(SubsimError::config("max-levels", "max_levels must be positive"));
        }
        let num_chains = seed_count(self.samples_per_level, self.p0)?;
        if self.samples_per_level % num_chains != 0 {
            return Err(SubsimError::Config(
                ErrorInfo::new(
                    "chain-divisibility",
                    "samples_per_level must be divisible by the number of chains",
                )
                .with_context("samples_per_level", self.samples_per_level)
                .with_context("num_chains", num_chains),
            ));
        }
        let chains_per_adaptation = self.proposal.validate(num_chains)?;
        Ok(LevelPlan {
            num_chains,
            states_per_chain: self.samples_per_level / num_chains,
            chains_per_adaptation,
        })
    }
}

impl ProposalConfig {
    fn validate(&self, num_chains: usize) -> Result<usize, SubsimError> {
        match self {
            ProposalConfig::ConditionalSampling { std } => {
                check_unit_interval("proposal-std", *std)?;
                Ok(num_chains)
            }
            ProposalConfig::AdaptiveConditionalSampling {
                std,
                initial_lambda,
                chains_per_adaptation,
            } => {
                check_unit_interval("proposal-std", *std)?;
                if !(initial_lambda.is_finite() && *initial_lambda > 0.0) {
                    return Err(SubsimError::Config(
                        ErrorInfo::new("initial-lambda", "initial_lambda must be positive")
                            .with_context("initial_lambda", initial_lambda),
                    ));
                }
                let batch = chains_per_adaptation.unwrap_or(num_chains);
                if batch == 0 || num_chains % batch != 0 {
                    return Err(SubsimError::Config(
                        ErrorInfo::new(
                            "adaptation-batch",
                            "chains_per_adaptation must divide the number of chains",
                        )
                        .with_context("chains_per_adaptation", batch)
                        .with_context("num_chains", num_chains),
                    ));
                }
                Ok(batch)
            }
            ProposalConfig::ModifiedMetropolis { spread } => {
                if !(spread.is_finite() && *spread > 0.0) {
                    return Err(SubsimError::Config(
                        ErrorInfo::new("mma-spread", "spread must be positive")
                            .with_context("spread", spread),
                    ));
                }
                Ok(num_chains)
            }
        }
    }
}

fn check_unit_interval(code: &str, value: f64) -> Result<(), SubsimError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SubsimError::Config(
            ErrorInfo::new(code, "proposal standard deviation must lie in (0, 1]")
                .with_context("value", value),
        ))
    }
}

/// Number of seeds `N * p0`, which must be a positive integer smaller than `N`.
pub fn seed_count(num_samples: usize, p0: f64) -> Result<usize, SubsimError> {
    let exact = num_samples as f64 * p0;
    let rounded = exact.round();
    if (exact - rounded).abs() > INTEGER_TOLERANCE * exact.max(1.0) {
        return Err(SubsimError::Config(
            ErrorInfo::new("seed-count", "samples_per_level * p0 must be an integer")
                .with_context("samples_per_level", num_samples)
                .with_context("p0", p0)
                .with_hint("pick samples_per_level as a multiple of 1 / p0"),
        ));
    }
    let count = rounded as usize;
    if count == 0 || count >= num_samples {
        return Err(SubsimError::Config(
            ErrorInfo::new("seed-count", "samples_per_level * p0 must lie in [1, N)")
                .with_context("samples_per_level", num_samples)
                .with_context("p0", p0),
        ));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_derives_plan() {
        let plan = RunConfig::default().validate().unwrap();
        assert_eq!(plan.num_chains, 100);
        assert_eq!(plan.states_per_chain, 10);
        assert_eq!(plan.chains_per_adaptation, 100);
    }

    #[test]
    fn non_integer_seed_count_is_rejected() {
        let config = RunConfig {
            samples_per_level: 1005,
            ..RunConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.info().code, "seed-count");
    }

    #[test]
    fn non_dividing_chain_count_is_rejected() {
        // 30 * 0.4 = 12 chains, which do not divide 30 samples.
        let config = RunConfig {
            samples_per_level: 30,
            p0: 0.4,
            ..RunConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.info().code, "chain-divisibility");
    }

    #[test]
    fn parameter_ranges_are_checked() {
        let bad_p0 = RunConfig {
            p0: 1.0,
            ..RunConfig::default()
        };
        assert_eq!(bad_p0.validate().unwrap_err().info().code, "p0-range");

        let bad_dim = RunConfig {
            dimension: 0,
            ..RunConfig::default()
        };
        assert_eq!(bad_dim.validate().unwrap_err().info().code, "dimension");

        let bad_std = RunConfig {
            proposal: ProposalConfig::ConditionalSampling { std: 1.5 },
            ..RunConfig::default()
        };
        assert_eq!(bad_std.validate().unwrap_err().info().code, "proposal-std");

        let bad_batch = RunConfig {
            proposal: ProposalConfig::AdaptiveConditionalSampling {
                std: 0.5,
                initial_lambda: 0.6,
                chains_per_adaptation: Some(7),
            },
            ..RunConfig::default()
        };
        assert_eq!(
            bad_batch.validate().unwrap_err().info().code,
            "adaptation-batch"
        );
    }

    #[test]
    fn yaml_defaults_fill_missing_fields() {
        let config = RunConfig::from_yaml(
            "dimension: 4\nsamples_per_level: 500\nproposal:\n  type: adaptive-conditional-sampling\n  chains_per_adaptation: 10\n",
        )
        .unwrap();
        assert_eq!(config.p0, 0.1);
        assert_eq!(
            config.proposal,
            ProposalConfig::AdaptiveConditionalSampling {
                std: 0.8,
                initial_lambda: 0.6,
                chains_per_adaptation: Some(10),
            }
        );
        assert_eq!(config.validate().unwrap().chains_per_adaptation, 10);
    }
}
