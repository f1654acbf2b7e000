//! Configuration validation.

use crate::LATEST_VERSION;
use crate::schema::{AnalysisConfig, EkmaDef, RirDef, SolverDef, SweepDef};
use std::collections::{BTreeMap, HashSet};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite and > 0"))
    }
}

pub fn validate_config(config: &AnalysisConfig) -> Result<(), ValidationError> {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    validate_ekma(&config.ekma)?;
    if let Some(rir) = &config.rir {
        validate_rir(rir)?;
    }
    if let Some(solver) = &config.solver {
        validate_solver(solver)?;
    }
    if let Some(sweep) = &config.sweep {
        let baseline = config.rir.as_ref().map(|r| &r.baseline);
        validate_sweep(sweep, baseline, config.solver.is_some())?;
    }
    Ok(())
}

fn validate_ekma(ekma: &EkmaDef) -> Result<(), ValidationError> {
    if ekma.voc_points < 2 {
        return Err(invalid("ekma.voc_points", ekma.voc_points, "must be >= 2"));
    }
    if ekma.nox_points < 2 {
        return Err(invalid("ekma.nox_points", ekma.nox_points, "must be >= 2"));
    }
    if !(ekma.smoothing_sigma.is_finite() && ekma.smoothing_sigma >= 0.0) {
        return Err(invalid(
            "ekma.smoothing_sigma",
            ekma.smoothing_sigma,
            "must be finite and >= 0",
        ));
    }
    if let Some([lo, hi]) = ekma.percentile_window {
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo >= hi {
            return Err(invalid(
                "ekma.percentile_window",
                format!("[{lo}, {hi}]"),
                "must be increasing within [0, 100]",
            ));
        }
    }
    let t = &ekma.thresholds;
    if !(t.voc_limited_min.is_finite() && t.nox_limited_max.is_finite())
        || t.nox_limited_max < 0.0
    {
        return Err(invalid(
            "ekma.thresholds",
            format!("{}/{}", t.voc_limited_min, t.nox_limited_max),
            "must be finite and non-negative",
        ));
    }
    if t.voc_limited_min < t.nox_limited_max {
        return Err(invalid(
            "ekma.thresholds.voc_limited_min",
            t.voc_limited_min,
            "must not be below nox_limited_max",
        ));
    }
    let r = &ekma.ratio_thresholds;
    if !(r.voc_limited_below.is_finite() && r.nox_limited_above.is_finite())
        || r.voc_limited_below > r.nox_limited_above
    {
        return Err(invalid(
            "ekma.ratio_thresholds",
            format!("{}/{}", r.voc_limited_below, r.nox_limited_above),
            "voc_limited_below must not exceed nox_limited_above",
        ));
    }
    if let Some(w) = ekma.segment_window {
        if w < 2 {
            return Err(invalid("ekma.segment_window", w, "must be >= 2"));
        }
    }
    Ok(())
}

fn validate_rir(rir: &RirDef) -> Result<(), ValidationError> {
    if !(rir.delta > 0.0 && rir.delta < 1.0) {
        return Err(invalid("rir.delta", rir.delta, "must lie in (0, 1)"));
    }
    positive("rir.normalization", rir.normalization)?;
    positive("rir.iqr_multiplier", rir.iqr_multiplier)?;
    if rir.min_samples < 3 {
        return Err(invalid("rir.min_samples", rir.min_samples, "must be >= 3"));
    }
    for (species, value) in rir.baseline.iter().chain(&rir.fallback_coefficients) {
        if !value.is_finite() {
            return Err(invalid(species, value, "must be finite"));
        }
    }
    if let Some((species, value)) = rir.baseline.iter().find(|(_, v)| **v < 0.0) {
        return Err(invalid(
            &format!("rir.baseline.{species}"),
            value,
            "concentration must be >= 0",
        ));
    }

    let mut labels = HashSet::new();
    for target in &rir.targets {
        if !labels.insert(&target.label) {
            return Err(ValidationError::DuplicateId {
                id: target.label.clone(),
                context: "rir.targets".to_string(),
            });
        }
        if target.species.is_empty() {
            return Err(invalid(
                &format!("rir.targets.{}", target.label),
                "[]",
                "must name at least one species",
            ));
        }
        for species in &target.species {
            if !rir.baseline.contains_key(species) {
                return Err(ValidationError::MissingReference {
                    id: species.clone(),
                    context: format!("rir.targets.{} (not in rir.baseline)", target.label),
                });
            }
        }
    }
    for f in &rir.reduction_factors {
        positive("rir.reduction_factors", *f)?;
        if *f == 1.0 {
            return Err(invalid("rir.reduction_factors", f, "1.0 is the baseline"));
        }
    }
    Ok(())
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    if solver.program.trim().is_empty() {
        return Err(invalid("solver.program", "\"\"", "must not be empty"));
    }
    if solver.o3_column.trim().is_empty() {
        return Err(invalid("solver.o3_column", "\"\"", "must not be empty"));
    }
    positive("solver.timeout_s", solver.timeout_s)?;
    if let Some(k) = solver.ppb_to_molecules {
        positive("solver.ppb_to_molecules", k)?;
    }
    if solver.parallel_workers == 0 {
        return Err(invalid("solver.parallel_workers", 0, "must be >= 1"));
    }
    Ok(())
}

fn validate_sweep(
    sweep: &SweepDef,
    baseline: Option<&BTreeMap<String, f64>>,
    has_solver: bool,
) -> Result<(), ValidationError> {
    if !has_solver {
        return Err(ValidationError::MissingReference {
            id: "solver".to_string(),
            context: "sweep".to_string(),
        });
    }
    let Some(baseline) = baseline else {
        return Err(ValidationError::MissingReference {
            id: "rir.baseline".to_string(),
            context: "sweep".to_string(),
        });
    };
    for (field, group) in [
        ("sweep.voc_species", &sweep.voc_species),
        ("sweep.nox_species", &sweep.nox_species),
    ] {
        if group.is_empty() {
            return Err(invalid(field, "[]", "must name at least one species"));
        }
        if let Some(s) = group.iter().find(|s| !baseline.contains_key(*s)) {
            return Err(ValidationError::MissingReference {
                id: s.clone(),
                context: format!("{field} (not in rir.baseline)"),
            });
        }
    }
    if let Some(s) = sweep.voc_species.iter().find(|s| sweep.nox_species.contains(s)) {
        return Err(ValidationError::DuplicateId {
            id: s.clone(),
            context: "sweep.voc_species and sweep.nox_species".to_string(),
        });
    }
    for (field, factors) in [
        ("sweep.voc_factors", &sweep.voc_factors),
        ("sweep.nox_factors", &sweep.nox_factors),
    ] {
        if factors.is_empty() {
            return Err(invalid(field, "[]", "must list at least one factor"));
        }
        for f in factors {
            positive(field, *f)?;
        }
    }
    Ok(())
}
