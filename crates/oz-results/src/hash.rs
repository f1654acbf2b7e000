//! Content-based hashing for run IDs.

use crate::types::RunKind;
use oz_project::AnalysisConfig;
use sha2::{Digest, Sha256};

/// SHA-256 of raw input bytes, hex encoded.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Run id from the configuration, the run kind, an input digest and the tool version.
pub fn compute_run_id(
    config: &AnalysisConfig,
    kind: &RunKind,
    input_digest: &str,
    tool_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    let kind_json = serde_json::to_string(kind).unwrap_or_default();
    hasher.update(kind_json.as_bytes());

    hasher.update(input_digest.as_bytes());
    hasher.update(tool_version.as_bytes());

    format!("{:x}", hasher.finalize())
}
