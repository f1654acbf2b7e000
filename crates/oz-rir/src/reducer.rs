//! Reduction of scenario outcomes or observations to RIR coefficients.
//!
//! Three strategies exist and the result always records which one produced
//! it: finite differences over solver runs, rank correlation over an
//! observation set, and a labelled table of literature-typical defaults used
//! only when nothing better is available.

use crate::error::{RirError, RirResult};
use crate::scenario::ScenarioResult;
use oz_core::{ObservationSet, Real, Tolerance, stats};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RirMethod {
    FiniteDifference,
    Correlation,
    FallbackDefault,
}

impl RirMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FiniteDifference => "FINITE_DIFFERENCE",
            Self::Correlation => "CORRELATION",
            Self::FallbackDefault => "FALLBACK_DEFAULT",
        }
    }
}

impl fmt::Display for RirMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller preference for the reduction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyHint {
    /// Finite differences when runs succeeded, else correlation, else defaults.
    #[default]
    Auto,
    FiniteDifference,
    Correlation,
}

/// Literature-typical coefficients reported under `FALLBACK_DEFAULT`.
pub fn default_fallback_coefficients() -> BTreeMap<String, Real> {
    [("NOx", 1.8), ("NVOC", -0.9), ("AVOC", 2.5), ("CO", -0.3)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RirConfig {
    /// Multiplies every computed coefficient (1.0 leaves them as elasticities).
    pub normalization: Real,
    /// Cleaned observations needed before correlation is attempted.
    pub min_samples: usize,
    /// Tukey fence multiplier for the O3 outlier filter.
    pub iqr_multiplier: Real,
    pub fallback_coefficients: BTreeMap<String, Real>,
}

impl Default for RirConfig {
    fn default() -> Self {
        Self {
            normalization: 1.0,
            min_samples: 10,
            iqr_multiplier: 1.5,
            fallback_coefficients: default_fallback_coefficients(),
        }
    }
}

impl RirConfig {
    pub fn validate(&self) -> RirResult<()> {
        if !(self.normalization.is_finite() && self.normalization > 0.0) {
            return Err(RirError::invalid(format!(
                "normalization must be finite and > 0 (got {})",
                self.normalization
            )));
        }
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier > 0.0) {
            return Err(RirError::invalid(format!(
                "iqr_multiplier must be finite and > 0 (got {})",
                self.iqr_multiplier
            )));
        }
        if self.min_samples < 3 {
            return Err(RirError::invalid("min_samples must be at least 3"));
        }
        Ok(())
    }
}

/// Keys of a `CORRELATION` result. Observations only carry bulk NOx and VOC.
pub const CORRELATION_KEYS: [&str; 2] = ["NOx", "VOC"];

/// Species to coefficient, with the strategy that produced the numbers.
///
/// The key set depends on `method`:
/// - `FINITE_DIFFERENCE`: the perturbed targets' labels;
/// - `CORRELATION`: [`CORRELATION_KEYS`];
/// - `FALLBACK_DEFAULT`: the configured fallback table (by default `NOx`,
///   `NVOC`, `AVOC` and `CO`).
///
/// Only `NOx` is common to the defaults. Look coefficients up by name and
/// check `method` before comparing results.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityResult {
    pub coefficients: BTreeMap<String, Real>,
    pub method: RirMethod,
    /// Species whose runs failed and which therefore have no coefficient.
    pub skipped: Vec<String>,
    /// Why a fallback or partial result was produced.
    pub note: Option<String>,
}

impl SensitivityResult {
    pub fn coefficient(&self, species: &str) -> Option<Real> {
        self.coefficients.get(species).copied()
    }

    /// False for placeholder results.
    pub fn is_computed(&self) -> bool {
        self.method != RirMethod::FallbackDefault
    }

    /// The configured fallback table, labelled `FALLBACK_DEFAULT`.
    pub fn fallback(config: &RirConfig, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "using fallback RIR coefficients");
        Self {
            coefficients: config.fallback_coefficients.clone(),
            method: RirMethod::FallbackDefault,
            skipped: Vec::new(),
            note: Some(reason),
        }
    }
}

/// Central difference: `(plus - minus) / (2 delta) / base * normalization`.
///
/// `None` when the baseline is not positive or any input is not finite.
pub fn finite_difference(
    base: Real,
    minus: Real,
    plus: Real,
    delta: Real,
    normalization: Real,
) -> Option<Real> {
    if !(base.is_finite() && base > 0.0 && delta > 0.0) {
        return None;
    }
    let rir = (plus - minus) / (2.0 * delta) / base * normalization;
    rir.is_finite().then_some(rir)
}

/// One-sided reduction: `(perturbed - base) / (factor - 1) / base * normalization`.
pub fn one_sided(base: Real, perturbed: Real, factor: Real, normalization: Real) -> Option<Real> {
    if !(base.is_finite() && base > 0.0) || Tolerance::TIGHT.approx_eq(factor, 1.0) {
        return None;
    }
    let rir = (perturbed - base) / (factor - 1.0) / base * normalization;
    rir.is_finite().then_some(rir)
}

/// The two perturbed runs of one species (or group) at `1 -/+ delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRuns {
    pub species: String,
    pub delta: Real,
    pub minus: ScenarioResult,
    pub plus: ScenarioResult,
}

/// Reduce solver runs, falling back to `observations` or defaults as needed.
///
/// With a usable baseline, every species whose two runs succeeded gets a
/// finite-difference coefficient and the rest are listed in `skipped`. If the
/// baseline failed or no species has both runs, the observation set is
/// reduced by correlation (unless the hint demands finite differences), and
/// failing that the fallback table is returned.
pub fn reduce(
    baseline: &ScenarioResult,
    perturbed: &[SpeciesRuns],
    observations: Option<&ObservationSet>,
    hint: StrategyHint,
    config: &RirConfig,
) -> SensitivityResult {
    if hint == StrategyHint::Correlation {
        return match observations {
            Some(obs) => reduce_observations(obs, config),
            None => SensitivityResult::fallback(config, "correlation requested without observations"),
        };
    }

    let base = baseline.max_o3().filter(|b| *b > 0.0);
    let mut coefficients = BTreeMap::new();
    let mut skipped = Vec::new();
    for runs in perturbed {
        let value = match (base, runs.minus.max_o3(), runs.plus.max_o3()) {
            (Some(b), Some(m), Some(p)) => {
                finite_difference(b, m, p, runs.delta, config.normalization)
            }
            _ => None,
        };
        match value {
            Some(v) => {
                coefficients.insert(runs.species.clone(), v);
            }
            None => skipped.push(runs.species.clone()),
        }
    }

    if !coefficients.is_empty() {
        let note = (!skipped.is_empty())
            .then(|| format!("no coefficient for {}: perturbed runs failed", skipped.join(", ")));
        tracing::info!(
            method = RirMethod::FiniteDifference.label(),
            computed = coefficients.len(),
            skipped = skipped.len(),
            "reduced scenario runs"
        );
        return SensitivityResult {
            coefficients,
            method: RirMethod::FiniteDifference,
            skipped,
            note,
        };
    }

    let reason = if base.is_none() {
        format!("baseline run unusable ({})", baseline.status())
    } else {
        "all perturbed runs failed".to_string()
    };
    match (hint, observations) {
        (StrategyHint::Auto, Some(obs)) => {
            tracing::warn!(reason = %reason, "finite differences unavailable, trying correlation");
            reduce_observations(obs, config)
        }
        _ => SensitivityResult::fallback(config, reason),
    }
}

/// Rank-correlation RIR over observations, keyed by [`CORRELATION_KEYS`].
///
/// O3 outliers are removed with the IQR rule first. Each coefficient is the
/// Spearman rho rescaled by `sd(ln O3) / sd(ln C)`, i.e. an elasticity in the
/// same units as the finite-difference result, times `normalization`.
pub fn reduce_observations(observations: &ObservationSet, config: &RirConfig) -> SensitivityResult {
    let cleaned = observations.cleaned().filter_o3_iqr(config.iqr_multiplier);
    if cleaned.len() < config.min_samples {
        return SensitivityResult::fallback(
            config,
            format!(
                "{} usable observations, {} required",
                cleaned.len(),
                config.min_samples
            ),
        );
    }

    let o3 = cleaned.o3();
    let mut coefficients = BTreeMap::new();
    let mut skipped = Vec::new();
    let [nox_key, voc_key] = CORRELATION_KEYS;
    for (species, conc) in [(nox_key, cleaned.nox()), (voc_key, cleaned.voc())] {
        match elasticity(&conc, &o3, config.min_samples) {
            Some(e) => {
                coefficients.insert(species.to_string(), e * config.normalization);
            }
            None => skipped.push(species.to_string()),
        }
    }

    if coefficients.is_empty() {
        return SensitivityResult::fallback(config, "observations carry no usable variation");
    }
    tracing::info!(
        method = RirMethod::Correlation.label(),
        samples = cleaned.len(),
        "reduced observations"
    );
    let note = (!skipped.is_empty()).then(|| format!("no variation in {}", skipped.join(", ")));
    SensitivityResult {
        coefficients,
        method: RirMethod::Correlation,
        skipped,
        note,
    }
}

fn elasticity(conc: &[Real], o3: &[Real], min_samples: usize) -> Option<Real> {
    let (ln_c, ln_o3): (Vec<Real>, Vec<Real>) = conc
        .iter()
        .zip(o3)
        .filter(|(c, o)| **c > 0.0 && **o > 0.0)
        .map(|(c, o)| (c.ln(), o.ln()))
        .unzip();
    if ln_c.len() < min_samples {
        return None;
    }
    let rho = stats::spearman(&ln_c, &ln_o3)?;
    let sd_c = stats::std_dev(&ln_c)?;
    let sd_o3 = stats::std_dev(&ln_o3)?;
    if sd_c <= 0.0 {
        return None;
    }
    let e = rho * sd_o3 / sd_c;
    e.is_finite().then_some(e)
}

/// One run of a one-sided reduction sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionRun {
    pub label: String,
    pub factor: Real,
    pub result: ScenarioResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReductionSensitivity {
    pub label: String,
    pub factor: Real,
    /// `None` when the baseline or this run failed.
    pub rir: Option<Real>,
}

/// One-sided RIR for each reduction run against the baseline.
pub fn reduction_sensitivities(
    baseline: &ScenarioResult,
    runs: &[ReductionRun],
    normalization: Real,
) -> Vec<ReductionSensitivity> {
    runs.iter()
        .map(|run| ReductionSensitivity {
            label: run.label.clone(),
            factor: run.factor,
            rir: match (baseline.max_o3(), run.result.max_o3()) {
                (Some(b), Some(p)) => one_sided(b, p, run.factor, normalization),
                _ => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioStatus;
    use oz_core::ObservationRow;

    fn ok(id: &str, v: Real) -> ScenarioResult {
        ScenarioResult::ok(id, v, None)
    }

    fn failed(id: &str) -> ScenarioResult {
        ScenarioResult::failed(id, ScenarioStatus::SolverFailed, "exit status: 1")
    }

    fn nox_runs(minus: ScenarioResult, plus: ScenarioResult) -> SpeciesRuns {
        SpeciesRuns {
            species: "NOx".into(),
            delta: 0.2,
            minus,
            plus,
        }
    }

    /// O3 falls as NOx rises and climbs with VOC.
    fn synthetic_observations(n: usize) -> ObservationSet {
        (0..n)
            .map(|i| {
                let nox = 10.0 + 40.0 * i as Real / n as Real;
                let voc = 20.0 + 60.0 * ((i * 7) % n) as Real / n as Real;
                ObservationRow::new(voc, nox, 30.0 + 0.5 * voc - 0.5 * nox)
            })
            .collect()
    }

    #[test]
    fn worked_example() {
        let rir = finite_difference(58.0, 62.0, 54.0, 0.2, 1.0).unwrap();
        assert!((rir - (-0.3448)).abs() < 1e-3, "{rir}");

        let result = reduce(
            &ok("base", 58.0),
            &[nox_runs(ok("NOx_minus", 62.0), ok("NOx_plus", 54.0))],
            None,
            StrategyHint::Auto,
            &RirConfig::default(),
        );
        assert_eq!(result.method, RirMethod::FiniteDifference);
        assert!((result.coefficient("NOx").unwrap() + 0.3448).abs() < 1e-3);
        assert!(result.is_computed());
    }

    #[test]
    fn normalization_scales_linearly() {
        let a = finite_difference(58.0, 62.0, 54.0, 0.2, 1.0).unwrap();
        let b = finite_difference(58.0, 62.0, 54.0, 0.2, 100.0).unwrap();
        assert!((b - 100.0 * a).abs() < 1e-9);
        assert_eq!(finite_difference(0.0, 1.0, 2.0, 0.2, 1.0), None);
    }

    #[test]
    fn partial_failure_skips_species() {
        let isop = SpeciesRuns {
            species: "ISOP".into(),
            delta: 0.2,
            minus: failed("ISOP_minus"),
            plus: ok("ISOP_plus", 60.0),
        };
        let result = reduce(
            &ok("base", 58.0),
            &[nox_runs(ok("NOx_minus", 62.0), ok("NOx_plus", 54.0)), isop],
            None,
            StrategyHint::Auto,
            &RirConfig::default(),
        );
        assert_eq!(result.method, RirMethod::FiniteDifference);
        assert_eq!(result.skipped, vec!["ISOP".to_string()]);
        assert_eq!(result.coefficient("ISOP"), None);
        assert!(result.note.unwrap().contains("ISOP"));
    }

    #[test]
    fn all_runs_failed_without_observations_is_fallback() {
        let result = reduce(
            &ok("base", 58.0),
            &[nox_runs(failed("NOx_minus"), failed("NOx_plus"))],
            None,
            StrategyHint::FiniteDifference,
            &RirConfig::default(),
        );
        assert_eq!(result.method, RirMethod::FallbackDefault);
        assert!(!result.is_computed());
        assert_eq!(result.coefficient("NOx"), Some(1.8));
        assert_eq!(result.coefficient("CO"), Some(-0.3));
    }

    #[test]
    fn failed_baseline_falls_back_to_correlation() {
        let obs = synthetic_observations(40);
        let result = reduce(
            &failed("base"),
            &[nox_runs(ok("NOx_minus", 62.0), ok("NOx_plus", 54.0))],
            Some(&obs),
            StrategyHint::Auto,
            &RirConfig::default(),
        );
        assert_eq!(result.method, RirMethod::Correlation);
    }

    #[test]
    fn five_observations_give_fallback() {
        let result = reduce_observations(&synthetic_observations(5), &RirConfig::default());
        assert_eq!(result.method, RirMethod::FallbackDefault);
        assert_eq!(result.coefficients, default_fallback_coefficients());
        assert!(result.note.unwrap().contains("usable observations"));
    }

    #[test]
    fn correlation_signs_follow_the_data() {
        let result = reduce_observations(&synthetic_observations(60), &RirConfig::default());
        assert_eq!(result.method, RirMethod::Correlation);
        assert!(result.coefficient("NOx").unwrap() < 0.0);
        assert!(result.coefficient("VOC").unwrap() > 0.0);
    }

    #[test]
    fn key_sets_follow_the_method() {
        let keys = |r: &SensitivityResult| r.coefficients.keys().cloned().collect::<Vec<_>>();

        let fd = reduce(
            &ok("base", 58.0),
            &[nox_runs(ok("NOx_minus", 62.0), ok("NOx_plus", 54.0))],
            None,
            StrategyHint::Auto,
            &RirConfig::default(),
        );
        assert_eq!(keys(&fd), ["NOx"]);

        let corr = reduce_observations(&synthetic_observations(60), &RirConfig::default());
        assert_eq!(corr.method, RirMethod::Correlation);
        assert_eq!(keys(&corr), CORRELATION_KEYS);

        let fallback = reduce_observations(&synthetic_observations(5), &RirConfig::default());
        assert_eq!(keys(&fallback), ["AVOC", "CO", "NOx", "NVOC"]);

        // NOx is the one key every strategy reports.
        for r in [&fd, &corr, &fallback] {
            assert!(r.coefficient("NOx").is_some(), "{}", r.method);
        }
    }

    #[test]
    fn correlation_hint_without_observations() {
        let result = reduce(
            &ok("base", 58.0),
            &[],
            None,
            StrategyHint::Correlation,
            &RirConfig::default(),
        );
        assert_eq!(result.method, RirMethod::FallbackDefault);
    }

    #[test]
    fn one_sided_reductions() {
        let runs = vec![
            ReductionRun {
                label: "NOx".into(),
                factor: 0.8,
                result: ok("NOx_scale_00", 60.0),
            },
            ReductionRun {
                label: "NOx".into(),
                factor: 0.5,
                result: failed("NOx_scale_01"),
            },
        ];
        let out = reduction_sensitivities(&ok("base", 58.0), &runs, 100.0);
        // (60 - 58) / (0.8 - 1) / 58 * 100
        assert!((out[0].rir.unwrap() - (-17.241)).abs() < 1e-2);
        assert_eq!(out[1].rir, None);
        assert_eq!(one_sided(58.0, 60.0, 1.0, 1.0), None);
    }

    #[test]
    fn config_validation() {
        assert!(RirConfig::default().validate().is_ok());
        let bad = RirConfig {
            normalization: 0.0,
            ..RirConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = RirConfig {
            iqr_multiplier: -1.0,
            ..RirConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn finite_difference_is_antisymmetric(
            base in 1.0_f64..200.0,
            a in 0.0_f64..200.0,
            b in 0.0_f64..200.0,
            delta in 0.01_f64..0.99,
            norm in 0.1_f64..100.0,
        ) {
            let fwd = finite_difference(base, a, b, delta, norm).unwrap();
            let rev = finite_difference(base, b, a, delta, norm).unwrap();
            prop_assert_eq!(fwd, -rev);
        }
    }
}
