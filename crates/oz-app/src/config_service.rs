//! Configuration loading and mapping onto the analysis crates.

use oz_ekma::{
    InterpolationMethod, InterpolationOptions, PercentileWindow, RatioThresholds,
    RegimeThresholds, Resolution,
};
use oz_project::{AnalysisConfig, EkmaDef, InterpolationMethodDef, RirDef, SolverDef, StrategyDef};
use oz_rir::{ConcentrationTable, ExternalSolver, ExternalSolverConfig, RirConfig, StrategyHint};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Summary of a configuration for display.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub name: String,
    pub version: u32,
    pub grid: (usize, usize),
    pub targets: Vec<String>,
    pub has_solver: bool,
    pub has_sweep: bool,
}

/// Load and validate a YAML or JSON configuration.
pub fn load_config(path: &Path) -> AppResult<AnalysisConfig> {
    let config = oz_project::load(path)?;
    tracing::debug!(path = %path.display(), name = %config.name, "loaded configuration");
    Ok(config)
}

pub fn summarize(config: &AnalysisConfig) -> ConfigSummary {
    ConfigSummary {
        name: config.name.clone(),
        version: config.version,
        grid: (config.ekma.voc_points, config.ekma.nox_points),
        targets: config
            .rir
            .as_ref()
            .map(|r| r.targets.iter().map(|t| t.label.clone()).collect())
            .unwrap_or_default(),
        has_solver: config.solver.is_some(),
        has_sweep: config.sweep.is_some(),
    }
}

pub fn interpolation_options(ekma: &EkmaDef) -> InterpolationOptions {
    InterpolationOptions {
        resolution: Resolution {
            voc_points: ekma.voc_points,
            nox_points: ekma.nox_points,
        },
        method: match ekma.method {
            InterpolationMethodDef::Linear => InterpolationMethod::Linear,
            InterpolationMethodDef::Cubic => InterpolationMethod::Cubic,
        },
        smoothing_sigma: ekma.smoothing_sigma,
        percentile_window: ekma
            .percentile_window
            .map(|[lower, upper]| PercentileWindow { lower, upper }),
    }
}

pub fn regime_thresholds(ekma: &EkmaDef) -> AppResult<RegimeThresholds> {
    Ok(RegimeThresholds::new(
        ekma.thresholds.voc_limited_min,
        ekma.thresholds.nox_limited_max,
    )?)
}

pub fn ratio_thresholds(ekma: &EkmaDef) -> RatioThresholds {
    RatioThresholds {
        voc_limited_below: ekma.ratio_thresholds.voc_limited_below,
        nox_limited_above: ekma.ratio_thresholds.nox_limited_above,
    }
}

pub fn rir_config(rir: &RirDef) -> AppResult<RirConfig> {
    let mut config = RirConfig {
        normalization: rir.normalization,
        min_samples: rir.min_samples,
        iqr_multiplier: rir.iqr_multiplier,
        ..RirConfig::default()
    };
    if !rir.fallback_coefficients.is_empty() {
        config.fallback_coefficients = rir.fallback_coefficients.clone();
    }
    config.validate()?;
    Ok(config)
}

pub fn strategy_hint(rir: &RirDef) -> StrategyHint {
    match rir.strategy {
        StrategyDef::Auto => StrategyHint::Auto,
        StrategyDef::FiniteDifference => StrategyHint::FiniteDifference,
        StrategyDef::Correlation => StrategyHint::Correlation,
    }
}

pub fn baseline_table(rir: &RirDef) -> AppResult<ConcentrationTable> {
    if rir.baseline.is_empty() {
        return Err(AppError::InvalidInput(
            "rir.baseline is empty; a solver run needs baseline concentrations".to_string(),
        ));
    }
    Ok(ConcentrationTable::from_pairs(
        rir.baseline.iter().map(|(k, v)| (k.clone(), *v)),
    )?)
}

pub fn solver_timeout(solver: &SolverDef) -> Duration {
    Duration::try_from_secs_f64(solver.timeout_s).unwrap_or(Duration::MAX)
}

/// Build the external solver; a relative `working_dir` resolves against `base_dir`
/// (normally the directory holding the configuration file).
pub fn external_solver(solver: &SolverDef, base_dir: &Path) -> AppResult<ExternalSolver> {
    let working_dir = resolve(base_dir, &solver.working_dir);
    if !working_dir.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "solver working_dir {} is not a directory",
            working_dir.display()
        )));
    }
    let config = ExternalSolverConfig {
        program: PathBuf::from(&solver.program),
        args: solver.args.clone(),
        working_dir,
        concentrations_file: PathBuf::from(&solver.concentrations_file),
        output_file: PathBuf::from(&solver.output_file),
        o3_column: solver.o3_column.clone(),
        time_column: solver.time_column.clone(),
        ppb_to_molecules: solver.ppb_to_molecules,
    };
    Ok(ExternalSolver::new(config)?)
}

pub(crate) fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Directory holding `config_path`, or `.` for a bare file name.
pub fn base_dir_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn maps_ekma_section() {
        let def = EkmaDef {
            voc_points: 30,
            nox_points: 20,
            method: InterpolationMethodDef::Linear,
            percentile_window: Some([5.0, 95.0]),
            ..EkmaDef::default()
        };
        let opts = interpolation_options(&def);
        assert_eq!(opts.resolution.voc_points, 30);
        assert_eq!(opts.resolution.nox_points, 20);
        assert_eq!(opts.method, InterpolationMethod::Linear);
        assert_eq!(opts.percentile_window.unwrap().upper, 95.0);
        assert_eq!(regime_thresholds(&def).unwrap(), RegimeThresholds::default());
    }

    #[test]
    fn empty_fallback_table_uses_builtin() {
        let cfg = rir_config(&RirDef::default()).unwrap();
        assert_eq!(cfg.fallback_coefficients, oz_rir::default_fallback_coefficients());

        let custom = RirDef {
            fallback_coefficients: BTreeMap::from([("NOx".to_string(), 0.5)]),
            ..RirDef::default()
        };
        assert_eq!(rir_config(&custom).unwrap().fallback_coefficients.len(), 1);
    }

    #[test]
    fn base_dir_for_bare_name() {
        assert_eq!(base_dir_of(Path::new("analysis.yaml")), PathBuf::from("."));
        assert_eq!(base_dir_of(Path::new("site/analysis.yaml")), PathBuf::from("site"));
        assert_eq!(resolve(Path::new("site"), "model"), PathBuf::from("site/model"));
    }
}
