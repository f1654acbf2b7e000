//! EKMA analysis: observations -> grid -> ridge -> regime.

use oz_core::{ObservationSet, Real};
use oz_ekma::{
    Grid, Regime, RegimeSegment, RidgeCurve, classify, classify_by_ratio, classify_segments,
    extract_ridge, interpolate, mean_abs_slope,
};
use oz_project::AnalysisConfig;
use oz_results::{EkmaRecord, RidgePointRecord, SegmentRecord};
use std::path::Path;
use std::time::Instant;

use crate::config_service;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct EkmaOutcome {
    pub grid: Grid,
    pub ridge: RidgeCurve,
    pub regime: Regime,
    pub mean_abs_slope: Option<Real>,
    pub segments: Vec<RegimeSegment>,
    /// Median VOC/NOx ratio indicator, for cross-checking the ridge verdict.
    pub ratio_regime: Regime,
}

pub fn run_ekma(config: &AnalysisConfig, observations: &ObservationSet) -> AppResult<EkmaOutcome> {
    let started = Instant::now();
    let opts = config_service::interpolation_options(&config.ekma);
    let thresholds = config_service::regime_thresholds(&config.ekma)?;

    tracing::info!(
        rows = observations.len(),
        method = %opts.method,
        voc_points = opts.resolution.voc_points,
        nox_points = opts.resolution.nox_points,
        "interpolating isopleth surface"
    );
    let grid = interpolate(observations, &opts)?;
    let (nrows, ncols) = grid.shape();
    tracing::info!(
        defined = grid.defined_count(),
        cells = nrows * ncols,
        "surface ready"
    );

    let ridge = extract_ridge(&grid);
    let regime = classify(&ridge, &thresholds);
    let slope = mean_abs_slope(&ridge);
    let segments = match config.ekma.segment_window {
        Some(w) => classify_segments(&ridge, &thresholds, w)?,
        None => Vec::new(),
    };
    let ratio_regime = classify_by_ratio(observations, &config_service::ratio_thresholds(&config.ekma));

    if regime != Regime::Undetermined && ratio_regime != Regime::Undetermined && regime != ratio_regime {
        tracing::warn!(ridge = %regime, ratio = %ratio_regime, "ridge and ratio indicators disagree");
    }
    tracing::info!(
        ridge_points = ridge.len(),
        regime = %regime,
        mean_abs_slope = slope.unwrap_or(Real::NAN),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "EKMA analysis finished"
    );

    Ok(EkmaOutcome {
        grid,
        ridge,
        regime,
        mean_abs_slope: slope,
        segments,
        ratio_regime,
    })
}

/// Write the surface in long form, one `VOC_ppb,NOx_ppb,O3_ppb` row per cell.
/// Undefined cells keep an empty O3 field.
pub fn write_grid_csv(grid: &Grid, path: &Path) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["VOC_ppb", "NOx_ppb", "O3_ppb"])
        .map_err(csv_error)?;
    let (nrows, ncols) = grid.shape();
    for r in 0..nrows {
        for c in 0..ncols {
            let o3 = grid.get(r, c).map(|v| v.to_string()).unwrap_or_default();
            writer
                .write_record([
                    grid.voc_axis()[c].to_string(),
                    grid.nox_axis()[r].to_string(),
                    o3,
                ])
                .map_err(csv_error)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Results(format!("CSV export failed: {err}"))
}

pub fn to_record(outcome: &EkmaOutcome) -> EkmaRecord {
    let grid = &outcome.grid;
    let (nrows, ncols) = grid.shape();
    EkmaRecord {
        voc_axis: grid.voc_axis().to_vec(),
        nox_axis: grid.nox_axis().to_vec(),
        o3: (0..nrows)
            .map(|r| (0..ncols).map(|c| grid.get(r, c)).collect())
            .collect(),
        ridge: outcome
            .ridge
            .iter()
            .map(|p| RidgePointRecord {
                voc: p.voc,
                nox: p.nox,
                o3: p.o3,
            })
            .collect(),
        regime: outcome.regime.label().to_string(),
        mean_abs_slope: outcome.mean_abs_slope,
        segments: outcome
            .segments
            .iter()
            .map(|s| SegmentRecord {
                voc_start: s.voc_start,
                voc_end: s.voc_end,
                mean_abs_slope: s.mean_abs_slope,
                regime: s.regime.label().to_string(),
            })
            .collect(),
        ratio_regime: Some(outcome.ratio_regime.label().to_string()),
    }
}
