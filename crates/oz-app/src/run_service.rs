//! Persisting and reading back analysis runs.

use oz_project::AnalysisConfig;
use oz_results::{ResultStore, RunKind, RunManifest, RunPayload, compute_run_id};
use std::path::Path;

use crate::config_service;
use crate::ekma_service::{self, EkmaOutcome};
use crate::error::AppResult;
use crate::rir_service::{self, RirOutcome};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where a run ended up.
#[derive(Debug, Clone)]
pub struct SavedRun {
    pub run_id: String,
    pub manifest: RunManifest,
    /// A run with the same id existed and was overwritten.
    pub replaced: bool,
}

/// Save an EKMA outcome next to `config_path`.
///
/// `input_digest` identifies the observation file, so the same config over
/// different data gets a different run id.
pub fn save_ekma(
    config_path: &Path,
    config: &AnalysisConfig,
    outcome: &EkmaOutcome,
    observations: usize,
    input_digest: &str,
) -> AppResult<SavedRun> {
    let (nox_points, voc_points) = outcome.grid.shape();
    let kind = RunKind::Ekma {
        voc_points,
        nox_points,
        method: config_service::interpolation_options(&config.ekma)
            .method
            .to_string(),
        observations,
    };
    let payload = RunPayload::Ekma(ekma_service::to_record(outcome));
    save(config_path, config, kind, payload, input_digest)
}

/// Save an RIR outcome. `input_digest` is the observation digest when
/// observations took part, otherwise empty.
pub fn save_rir(
    config_path: &Path,
    config: &AnalysisConfig,
    outcome: &RirOutcome,
    input_digest: &str,
) -> AppResult<SavedRun> {
    let kind = RunKind::Rir {
        strategy: outcome.result.method.label().to_string(),
        scenarios: outcome.scenarios.len(),
    };
    let payload = RunPayload::Rir(rir_service::to_record(outcome));
    save(config_path, config, kind, payload, input_digest)
}

fn save(
    config_path: &Path,
    config: &AnalysisConfig,
    kind: RunKind,
    payload: RunPayload,
    input_digest: &str,
) -> AppResult<SavedRun> {
    let store = ResultStore::for_config(config_path)?;
    let run_id = compute_run_id(config, &kind, input_digest, TOOL_VERSION);
    let replaced = store.has_run(&run_id);
    let manifest = RunManifest::now(run_id.clone(), &config.name, kind, TOOL_VERSION);
    store.save_run(&manifest, &payload)?;
    tracing::info!(run_id = %run_id, kind = manifest.kind.label(), replaced, "run saved");
    Ok(SavedRun {
        run_id,
        manifest,
        replaced,
    })
}

/// Stored runs for a configuration, most recent first.
pub fn list_runs(config_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = ResultStore::for_config(config_path)?;
    let mut runs = store.list_runs()?;
    runs.reverse();
    Ok(runs)
}

/// Load a run by id or unique id prefix.
pub fn load_run(config_path: &Path, run_id: &str) -> AppResult<(RunManifest, RunPayload)> {
    let store = ResultStore::for_config(config_path)?;
    let run_id = store.resolve(run_id)?;
    let manifest = store.load_manifest(&run_id)?;
    let payload = store.load_payload(&run_id)?;
    Ok((manifest, payload))
}

/// Remove a run by id or unique id prefix; returns the full id.
pub fn delete_run(config_path: &Path, run_id: &str) -> AppResult<String> {
    let store = ResultStore::for_config(config_path)?;
    let run_id = store.resolve(run_id)?;
    store.delete_run(&run_id)?;
    Ok(run_id)
}
