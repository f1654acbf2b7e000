//! RIR analysis: plan scenarios, run the solver, reduce to coefficients.

use oz_core::ObservationSet;
use oz_project::{AnalysisConfig, RirDef, SolverDef};
use oz_rir::{
    ReductionRun, ReductionSensitivity, Scenario, ScenarioResult, SensitivityResult, SpeciesRuns,
    StrategyHint, plan_baseline, plan_ekma_sweep, plan_group_perturbation, plan_labelled_scaling,
    reduce, reduce_observations, reduction_sensitivities, run_all, run_parallel,
    sweep_to_observations,
};
use oz_results::{ReductionRecord, RirRecord, ScenarioRecord};
use std::path::Path;

use crate::config_service;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct RirOutcome {
    pub result: SensitivityResult,
    /// Every solver run, baseline first. Empty without a solver.
    pub scenarios: Vec<ScenarioResult>,
    pub reductions: Vec<ReductionSensitivity>,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub scenarios: Vec<ScenarioResult>,
    pub observations: ObservationSet,
}

struct TargetPlan {
    label: String,
    minus: usize,
    plus: usize,
}

/// Compute RIR coefficients.
///
/// With a solver and targets configured (and a strategy other than
/// `correlation`), runs the baseline, `1 -/+ delta` perturbations per target
/// and any one-sided reductions. Otherwise reduces `observations`, or
/// reports the fallback table when there are none.
pub fn run_rir(
    config: &AnalysisConfig,
    base_dir: &Path,
    observations: Option<&ObservationSet>,
) -> AppResult<RirOutcome> {
    let rir = config.rir.clone().unwrap_or_default();
    let rir_cfg = config_service::rir_config(&rir)?;
    let hint = config_service::strategy_hint(&rir);

    let solver = match &config.solver {
        Some(s) if hint != StrategyHint::Correlation && !rir.targets.is_empty() => s,
        _ => {
            if hint == StrategyHint::FiniteDifference {
                tracing::warn!("finite differences requested without a solver and targets");
            }
            let result = match observations {
                Some(obs) => reduce_observations(obs, &rir_cfg),
                None => SensitivityResult::fallback(&rir_cfg, "no solver run and no observations"),
            };
            return Ok(RirOutcome {
                result,
                scenarios: Vec::new(),
                reductions: Vec::new(),
            });
        }
    };

    let baseline = config_service::baseline_table(&rir)?;
    let mut scenarios = vec![plan_baseline(&baseline)];
    let mut targets = Vec::with_capacity(rir.targets.len());
    for target in &rir.targets {
        let [minus, plus] =
            plan_group_perturbation(&baseline, &target.label, &target.species, rir.delta)?;
        targets.push(TargetPlan {
            label: target.label.clone(),
            minus: scenarios.len(),
            plus: scenarios.len() + 1,
        });
        scenarios.push(minus);
        scenarios.push(plus);
    }
    let mut reduction_slots = Vec::new();
    if !rir.reduction_factors.is_empty() {
        for target in &rir.targets {
            let planned = plan_labelled_scaling(
                &baseline,
                &target.label,
                &target.species,
                &rir.reduction_factors,
            )?;
            for scenario in planned {
                reduction_slots.push((target.label.clone(), scenario.scale_factor(), scenarios.len()));
                scenarios.push(scenario);
            }
        }
    }
    tracing::info!(
        scenarios = scenarios.len(),
        targets = targets.len(),
        delta = rir.delta,
        "planned RIR scenarios"
    );

    let results = execute(&scenarios, solver, base_dir)?;
    let failed = results.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some scenarios did not produce a result");
    }

    let base = &results[0];
    let runs: Vec<SpeciesRuns> = targets
        .iter()
        .map(|t| SpeciesRuns {
            species: t.label.clone(),
            delta: rir.delta,
            minus: results[t.minus].clone(),
            plus: results[t.plus].clone(),
        })
        .collect();
    let result = reduce(base, &runs, observations, hint, &rir_cfg);

    let reduction_runs: Vec<ReductionRun> = reduction_slots
        .into_iter()
        .map(|(label, factor, idx)| ReductionRun {
            label,
            factor,
            result: results[idx].clone(),
        })
        .collect();
    let reductions = reduction_sensitivities(base, &reduction_runs, rir_cfg.normalization);

    Ok(RirOutcome {
        result,
        scenarios: results,
        reductions,
    })
}

/// Run the configured VOC x NOx sweep and turn it into observation rows.
pub fn run_ekma_sweep(config: &AnalysisConfig, base_dir: &Path) -> AppResult<SweepOutcome> {
    let sweep = config
        .sweep
        .as_ref()
        .ok_or_else(|| AppError::InvalidInput("no sweep section in configuration".to_string()))?;
    let solver = config
        .solver
        .as_ref()
        .ok_or_else(|| AppError::InvalidInput("sweep needs a solver section".to_string()))?;
    let rir: RirDef = config.rir.clone().unwrap_or_default();
    let baseline = config_service::baseline_table(&rir)?;

    let scenarios = plan_ekma_sweep(
        &baseline,
        &sweep.voc_species,
        &sweep.nox_species,
        &sweep.voc_factors,
        &sweep.nox_factors,
    )?;
    tracing::info!(scenarios = scenarios.len(), "running EKMA sweep");
    let results = execute(&scenarios, solver, base_dir)?;
    let observations =
        sweep_to_observations(&scenarios, &results, &sweep.voc_species, &sweep.nox_species)?;
    if observations.len() < scenarios.len() {
        tracing::warn!(
            usable = observations.len(),
            total = scenarios.len(),
            "sweep points without a result were dropped"
        );
    }
    Ok(SweepOutcome {
        scenarios: results,
        observations,
    })
}

fn execute(
    scenarios: &[Scenario],
    solver_def: &SolverDef,
    base_dir: &Path,
) -> AppResult<Vec<ScenarioResult>> {
    let solver = config_service::external_solver(solver_def, base_dir)?;
    let timeout = config_service::solver_timeout(solver_def);
    let workers = solver_def.parallel_workers.min(scenarios.len()).max(1);
    let scratch_parent = match &solver_def.scratch_dir {
        Some(dir) => {
            let dir = config_service::resolve(base_dir, dir);
            if is_within(&dir, &solver.config().working_dir) {
                return Err(AppError::InvalidInput(format!(
                    "scratch_dir {} lies inside the solver working_dir",
                    dir.display()
                )));
            }
            dir
        }
        None => std::env::temp_dir(),
    };
    if workers == 1 {
        return Ok(run_all(scenarios, &solver, timeout));
    }

    // Unique per call; removed on drop, including when a copy fails midway.
    std::fs::create_dir_all(&scratch_parent)?;
    let scratch = tempfile::Builder::new()
        .prefix("ozonesens-")
        .tempdir_in(&scratch_parent)?;
    let copies = solver.isolated_copies(scratch.path(), workers)?;
    let results = run_parallel(scenarios, &copies, timeout);
    drop(copies);
    let root = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::warn!(dir = %root.display(), error = %e, "could not remove isolated solver copies");
    }
    Ok(results?)
}

fn is_within(dir: &Path, root: &Path) -> bool {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    dir.starts_with(root) || canonical(dir).starts_with(canonical(root))
}

pub fn to_record(outcome: &RirOutcome) -> RirRecord {
    RirRecord {
        method: outcome.result.method.label().to_string(),
        coefficients: outcome.result.coefficients.clone(),
        skipped: outcome.result.skipped.clone(),
        note: outcome.result.note.clone(),
        scenarios: outcome.scenarios.iter().map(scenario_record).collect(),
        reductions: outcome
            .reductions
            .iter()
            .map(|r| ReductionRecord {
                label: r.label.clone(),
                factor: r.factor,
                rir: r.rir,
            })
            .collect(),
    }
}

pub fn scenario_record(result: &ScenarioResult) -> ScenarioRecord {
    ScenarioRecord {
        id: result.scenario_id().to_string(),
        status: result.status().label().to_string(),
        max_o3: result.max_o3(),
        max_o3_time: result.max_o3_time(),
        detail: result.detail().map(str::to_string),
    }
}
