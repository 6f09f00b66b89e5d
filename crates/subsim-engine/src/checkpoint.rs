use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subsim_core::errors::ErrorInfo;
use subsim_core::SubsimError;

use crate::config::RunConfig;
use crate::kernel::LevelRecord;

/// State of a run at a level boundary.
///
/// The last entry of `levels` carries the threshold and seeds of the next
/// level, so resuming needs nothing beyond this payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Number of completed levels when the checkpoint was written.
    pub level: usize,
    /// Configuration snapshot associated with the run.
    pub config: RunConfig,
    /// Master seed used to derive chain substreams.
    pub master_seed: u64,
    /// Completed levels in creation order.
    pub levels: Vec<LevelRecord>,
    /// Adaptive scale parameter carried into the next level.
    pub lambda: Option<f64>,
    /// Evaluations spent before the checkpoint.
    pub evaluations: usize,
}

impl CheckpointPayload {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, SubsimError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("checkpoint-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let payload: Self = serde_json::from_str(&contents).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("checkpoint-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        if payload.master_seed != payload.config.seed_policy.master_seed {
            return Err(SubsimError::Serde(
                ErrorInfo::new("checkpoint-seed", "checkpoint seed differs from its configuration")
                    .with_context("path", path.display()),
            ));
        }
        Ok(payload)
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), SubsimError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                SubsimError::Serde(
                    ErrorInfo::new("checkpoint-mkdir", err.to_string())
                        .with_context("path", parent.display()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("checkpoint-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            SubsimError::Serde(
                ErrorInfo::new("checkpoint-write", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}

/// Checkpoint file for the boundary after `level` completed levels.
pub fn checkpoint_path(root: &Path, level: usize) -> PathBuf {
    root.join(format!("ckpt_level_{level:03}.json"))
}
