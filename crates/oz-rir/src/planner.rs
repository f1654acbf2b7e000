//! Scenario planning: single-species and group perturbations, scaling
//! sequences and the VOC x NOx sweep that feeds the EKMA path.
//!
//! Every scenario owns its own copy of the concentration table.

use crate::concentration::ConcentrationTable;
use crate::error::{RirError, RirResult};
use crate::scenario::{Scenario, ScenarioResult};
use oz_core::{ObservationRow, ObservationSet, Real};

pub const BASELINE_ID: &str = "base";

/// The unperturbed baseline run.
pub fn plan_baseline(baseline: &ConcentrationTable) -> Scenario {
    Scenario::new(BASELINE_ID, baseline.clone(), None, 1.0)
}

/// Scenarios at `1 - delta` and `1 + delta` for one species, in that order.
pub fn plan_species_perturbation(
    baseline: &ConcentrationTable,
    species: &str,
    delta: Real,
) -> RirResult<[Scenario; 2]> {
    plan_group_perturbation(baseline, species, &[species.to_string()], delta)
}

/// Scenarios at `1 - delta` and `1 + delta` scaling every member of `group`.
///
/// `label` names the group in scenario ids and results (e.g. `NOx` for
/// `[NO, NO2]`).
pub fn plan_group_perturbation(
    baseline: &ConcentrationTable,
    label: &str,
    group: &[String],
    delta: Real,
) -> RirResult<[Scenario; 2]> {
    if !(delta > 0.0 && delta < 1.0) {
        return Err(RirError::invalid(format!(
            "delta must lie in (0, 1) (got {delta})"
        )));
    }
    baseline.check_group(group)?;

    let minus = 1.0 - delta;
    let plus = 1.0 + delta;
    Ok([
        Scenario::new(
            format!("{label}_minus"),
            baseline.scaled(group, minus)?,
            Some(label.to_string()),
            minus,
        ),
        Scenario::new(
            format!("{label}_plus"),
            baseline.scaled(group, plus)?,
            Some(label.to_string()),
            plus,
        ),
    ])
}

fn check_factors(factors: &[Real]) -> RirResult<()> {
    if factors.is_empty() {
        return Err(RirError::invalid("scale factor list is empty"));
    }
    match factors.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
        Some(f) => Err(RirError::invalid(format!(
            "scale factors must be finite and > 0 (got {f})"
        ))),
        None => Ok(()),
    }
}

/// One scenario per factor, scaling the whole group by that factor.
pub fn plan_scaling_sequence(
    baseline: &ConcentrationTable,
    species_group: &[String],
    factors: &[Real],
) -> RirResult<Vec<Scenario>> {
    plan_labelled_scaling(baseline, &species_group.join("+"), species_group, factors)
}

/// As [`plan_scaling_sequence`], with an explicit group label.
pub fn plan_labelled_scaling(
    baseline: &ConcentrationTable,
    label: &str,
    species_group: &[String],
    factors: &[Real],
) -> RirResult<Vec<Scenario>> {
    baseline.check_group(species_group)?;
    check_factors(factors)?;
    factors
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            Ok(Scenario::new(
                format!("{label}_scale_{i:02}"),
                baseline.scaled(species_group, f)?,
                Some(label.to_string()),
                f,
            ))
        })
        .collect()
}

/// Cartesian VOC x NOx group scaling, VOC-major.
pub fn plan_ekma_sweep(
    baseline: &ConcentrationTable,
    voc_group: &[String],
    nox_group: &[String],
    voc_factors: &[Real],
    nox_factors: &[Real],
) -> RirResult<Vec<Scenario>> {
    baseline.check_group(voc_group)?;
    baseline.check_group(nox_group)?;
    if let Some(s) = voc_group.iter().find(|s| nox_group.contains(s)) {
        return Err(RirError::invalid(format!(
            "species {s} is in both the VOC and the NOx group"
        )));
    }
    check_factors(voc_factors)?;
    check_factors(nox_factors)?;

    let mut scenarios = Vec::with_capacity(voc_factors.len() * nox_factors.len());
    for (i, &fv) in voc_factors.iter().enumerate() {
        let voc_scaled = baseline.scaled(voc_group, fv)?;
        for (j, &fn_) in nox_factors.iter().enumerate() {
            scenarios.push(Scenario::new(
                format!("ekma_{i:02}_{j:02}"),
                voc_scaled.scaled(nox_group, fn_)?,
                None,
                1.0,
            ));
        }
    }
    Ok(scenarios)
}

/// Turn sweep outcomes into observation rows (group totals, peak O3).
///
/// Results are matched to scenarios by id; failed runs are skipped.
pub fn sweep_to_observations(
    scenarios: &[Scenario],
    results: &[ScenarioResult],
    voc_group: &[String],
    nox_group: &[String],
) -> RirResult<ObservationSet> {
    let mut rows = Vec::new();
    for scenario in scenarios {
        let Some(result) = results.iter().find(|r| r.scenario_id() == scenario.id()) else {
            continue;
        };
        let Some(o3) = result.max_o3() else { continue };
        let voc = scenario.table().total(voc_group)?;
        let nox = scenario.table().total(nox_group)?;
        rows.push(ObservationRow::new(voc, nox, o3));
    }
    tracing::debug!(
        scenarios = scenarios.len(),
        rows = rows.len(),
        "converted sweep to observations"
    );
    Ok(ObservationSet::new(rows))
}
