//! Provenance recorded alongside subsim artefacts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance information attached to every serialized artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Hash of the input configuration used to produce the data.
    pub input_hash: String,
    /// Master deterministic seed used for all randomness.
    pub seed: u64,
    /// ISO-8601 timestamp recording when the artefact was generated.
    pub created_at: String,
    /// Version map for all tools involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}
