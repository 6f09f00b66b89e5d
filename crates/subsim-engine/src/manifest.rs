use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subsim_core::errors::ErrorInfo;
use subsim_core::provenance::RunProvenance;
use subsim_core::SubsimError;

use crate::config::RunConfig;
use crate::kernel::RunSummary;

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Config hash, seed, timestamp and tool versions.
    pub provenance: RunProvenance,
    /// Failure probability estimate.
    pub failure_probability: f64,
    /// Aggregate COV assuming uncorrelated levels.
    pub cov: f64,
    /// Whether the failure domain was reached.
    pub is_finished: bool,
    /// Number of levels created.
    pub num_levels: usize,
    /// Performance function evaluations spent.
    pub evaluations: usize,
    /// Level table (relative to the run directory).
    pub levels_file: Option<PathBuf>,
    /// Checkpoint files retained at the end of the run, oldest first.
    pub checkpoints: Vec<PathBuf>,
}

impl RunManifest {
    /// Builds the manifest of a finished run rooted at `run_dir`.
    pub fn from_summary(
        config: &RunConfig,
        summary: &RunSummary,
        run_dir: &Path,
        checkpoints: &[PathBuf],
    ) -> Result<Self, SubsimError> {
        let mut tool_versions = std::collections::BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Ok(Self {
            config: config.clone(),
            seed_label: config.seed_policy.label.clone(),
            provenance: RunProvenance {
                input_hash: config_hash(config)?,
                seed: config.seed_policy.master_seed,
                created_at: chrono::Utc::now().to_rfc3339(),
                tool_versions,
            },
            failure_probability: summary.failure_probability,
            cov: summary.cov,
            is_finished: summary.is_finished,
            num_levels: summary.levels.len(),
            evaluations: summary.evaluations,
            levels_file: summary
                .levels_path
                .as_ref()
                .map(|path| relative_to(path, run_dir)),
            checkpoints: checkpoints
                .iter()
                .map(|path| relative_to(path, run_dir))
                .collect(),
        })
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), SubsimError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                SubsimError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, SubsimError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}

/// Hex SHA-256 of the canonical JSON form of `config`.
pub fn config_hash(config: &RunConfig) -> Result<String, SubsimError> {
    let canonical = serde_json::to_vec(config).map_err(|err| {
        SubsimError::Serde(ErrorInfo::new("config-serialize", err.to_string()))
    })?;
    let digest = Sha256::digest(&canonical);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
