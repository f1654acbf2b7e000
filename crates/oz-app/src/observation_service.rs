//! Loading normalized observation files.
//!
//! Accepted layouts: a JSON or YAML array of rows, or a CSV file with
//! `VOC_ppb,NOx_ppb,O3_ppb[,timestamp]` headers. Extra CSV columns are ignored.

use oz_core::{ObservationRow, ObservationSet};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Observations plus a digest of the raw file, used for run ids.
#[derive(Debug, Clone)]
pub struct LoadedObservations {
    pub set: ObservationSet,
    pub digest: String,
}

pub fn load_observations(path: &Path) -> AppResult<LoadedObservations> {
    let bytes = std::fs::read(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let set = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&bytes)?,
        Some("yaml") | Some("yml") => parse_yaml(&bytes)?,
        Some("csv") => parse_csv(&bytes)?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "unsupported observation file {} (expected .json, .yaml or .csv)",
                path.display()
            )));
        }
    };

    let invalid = set.len() - set.cleaned().len();
    if invalid > 0 {
        tracing::warn!(invalid, total = set.len(), "observation rows with missing or negative values will be ignored");
    }
    tracing::info!(path = %path.display(), rows = set.len(), "loaded observations");
    Ok(LoadedObservations {
        set,
        digest: oz_results::digest_bytes(&bytes),
    })
}

pub fn parse_json(bytes: &[u8]) -> AppResult<ObservationSet> {
    serde_json::from_slice(bytes).map_err(|e| AppError::Observations(e.to_string()))
}

pub fn parse_yaml(bytes: &[u8]) -> AppResult<ObservationSet> {
    serde_yaml::from_slice(bytes).map_err(|e| AppError::Observations(e.to_string()))
}

pub fn parse_csv(bytes: &[u8]) -> AppResult<ObservationSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<ObservationRow>().enumerate() {
        let row = record
            .map_err(|e| AppError::Observations(format!("CSV record {}: {e}", i + 1)))?;
        rows.push(row);
    }
    Ok(ObservationSet::new(rows))
}

/// Write rows as CSV with the header `load_observations` reads back.
pub fn write_observations_csv(set: &ObservationSet, path: &Path) -> AppResult<()> {
    let to_err = |e: csv::Error| AppError::Observations(format!("CSV write failed: {e}"));
    let mut writer = csv::Writer::from_path(path).map_err(to_err)?;
    writer
        .write_record(["VOC_ppb", "NOx_ppb", "O3_ppb", "timestamp"])
        .map_err(to_err)?;
    for row in set.rows() {
        let timestamp = row
            .timestamp
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default();
        writer
            .write_record([
                row.voc_ppb.to_string(),
                row.nox_ppb.to_string(),
                row.o3_ppb.to_string(),
                timestamp,
            ])
            .map_err(to_err)?;
    }
    writer.flush()?;
    Ok(())
}
