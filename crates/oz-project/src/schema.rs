//! Analysis configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub ekma: EkmaDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rir: Option<RirDef>,
    /// Absent: only correlation or fallback reductions are possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDef>,
    /// VOC x NOx solver sweep feeding the EKMA path. Needs `rir.baseline` and `solver`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethodDef {
    Linear,
    #[default]
    Cubic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EkmaDef {
    #[serde(default = "default_points")]
    pub voc_points: usize,
    #[serde(default = "default_points")]
    pub nox_points: usize,
    #[serde(default)]
    pub method: InterpolationMethodDef,
    /// Gaussian sigma in grid cells, 0 disables smoothing.
    #[serde(default)]
    pub smoothing_sigma: f64,
    /// `[lower, upper]` percentiles bounding the grid axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile_window: Option<[f64; 2]>,
    #[serde(default)]
    pub thresholds: SlopeThresholdsDef,
    #[serde(default)]
    pub ratio_thresholds: RatioThresholdsDef,
    /// Ridge points per segment for per-region labels; absent disables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_window: Option<usize>,
}

fn default_points() -> usize {
    100
}

impl Default for EkmaDef {
    fn default() -> Self {
        Self {
            voc_points: default_points(),
            nox_points: default_points(),
            method: InterpolationMethodDef::default(),
            smoothing_sigma: 0.0,
            percentile_window: None,
            thresholds: SlopeThresholdsDef::default(),
            ratio_thresholds: RatioThresholdsDef::default(),
            segment_window: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlopeThresholdsDef {
    pub voc_limited_min: f64,
    pub nox_limited_max: f64,
}

impl Default for SlopeThresholdsDef {
    fn default() -> Self {
        Self {
            voc_limited_min: 5.0,
            nox_limited_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatioThresholdsDef {
    pub voc_limited_below: f64,
    pub nox_limited_above: f64,
}

impl Default for RatioThresholdsDef {
    fn default() -> Self {
        Self {
            voc_limited_below: 4.0,
            nox_limited_above: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyDef {
    #[default]
    Auto,
    FiniteDifference,
    Correlation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RirDef {
    #[serde(default = "default_delta")]
    pub delta: f64,
    #[serde(default = "default_normalization")]
    pub normalization: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    #[serde(default)]
    pub strategy: StrategyDef,
    /// Empty means the built-in literature table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fallback_coefficients: BTreeMap<String, f64>,
    /// Baseline concentrations (ppb) handed to the solver.
    #[serde(default)]
    pub baseline: BTreeMap<String, f64>,
    #[serde(default)]
    pub targets: Vec<TargetDef>,
    /// One-sided reduction factors applied to every target (e.g. 0.8, 0.5).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reduction_factors: Vec<f64>,
}

fn default_delta() -> f64 {
    0.2
}

fn default_normalization() -> f64 {
    1.0
}

fn default_min_samples() -> usize {
    10
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

impl Default for RirDef {
    fn default() -> Self {
        Self {
            delta: default_delta(),
            normalization: default_normalization(),
            min_samples: default_min_samples(),
            iqr_multiplier: default_iqr_multiplier(),
            strategy: StrategyDef::default(),
            fallback_coefficients: BTreeMap::new(),
            baseline: BTreeMap::new(),
            targets: Vec::new(),
            reduction_factors: Vec::new(),
        }
    }
}

/// A perturbation target: a label and the species scaled together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetDef {
    pub label: String,
    pub species: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: String,
    #[serde(default = "default_concentrations_file")]
    pub concentrations_file: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default = "default_o3_column")]
    pub o3_column: String,
    #[serde(default = "default_time_column")]
    pub time_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppb_to_molecules: Option<f64>,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
    #[serde(default = "default_workers")]
    pub parallel_workers: usize,
    /// Where isolated copies go when `parallel_workers > 1`; defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
}

fn default_concentrations_file() -> String {
    "configuration/initialConcentrations.config".to_string()
}

fn default_output_file() -> String {
    "output/speciesConcentrations.output".to_string()
}

fn default_o3_column() -> String {
    "O3".to_string()
}

fn default_time_column() -> Option<String> {
    Some("t".to_string())
}

fn default_timeout_s() -> f64 {
    600.0
}

fn default_workers() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepDef {
    pub voc_species: Vec<String>,
    pub nox_species: Vec<String>,
    pub voc_factors: Vec<f64>,
    pub nox_factors: Vec<f64>,
}
