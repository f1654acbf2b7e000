//! Scenario execution against a kinetics solver.
//!
//! Failures are captured per scenario as a status; nothing here aborts a
//! sweep because one run went wrong, and no failed run is turned into a number.

use crate::error::{RirError, RirResult};
use crate::scenario::{Scenario, ScenarioResult, ScenarioStatus};
use crate::solver::{KineticsSolver, SolveFailure};
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Run one scenario and report its outcome.
pub fn run<S: KineticsSolver + ?Sized>(
    scenario: &Scenario,
    solver: &S,
    timeout: Duration,
) -> ScenarioResult {
    let id = scenario.id();
    tracing::info!(scenario = id, solver = solver.name(), "running scenario");
    let start = Instant::now();
    let outcome = solver.solve(scenario.table(), timeout);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(series) => match series.peak() {
            Some((max_o3, time)) => ScenarioResult::ok(id, max_o3, time),
            None => ScenarioResult::failed(
                id,
                ScenarioStatus::OutputMissing,
                "output has no finite O3 samples",
            ),
        },
        Err(SolveFailure::Failed(detail)) => {
            ScenarioResult::failed(id, ScenarioStatus::SolverFailed, detail)
        }
        Err(SolveFailure::TimedOut(limit)) => {
            tracing::warn!(scenario = id, timeout_s = limit.as_secs_f64(), "solver timed out");
            ScenarioResult::failed(
                id,
                ScenarioStatus::Timeout,
                format!("no result after {:.1} s", limit.as_secs_f64()),
            )
        }
        Err(SolveFailure::OutputMissing(detail)) => {
            ScenarioResult::failed(id, ScenarioStatus::OutputMissing, detail)
        }
    };

    match result.max_o3() {
        Some(max_o3) => {
            tracing::info!(scenario = id, max_o3, elapsed_ms, "scenario finished")
        }
        None => tracing::warn!(
            scenario = id,
            status = %result.status(),
            detail = result.detail().unwrap_or_default(),
            elapsed_ms,
            "scenario failed"
        ),
    }
    result
}

/// Run scenarios one after another on a single installation.
pub fn run_all<S: KineticsSolver + ?Sized>(
    scenarios: &[Scenario],
    solver: &S,
    timeout: Duration,
) -> Vec<ScenarioResult> {
    scenarios.iter().map(|s| run(s, solver, timeout)).collect()
}

/// Spread scenarios round-robin over isolated solver installations.
///
/// Each worker runs its share sequentially; results come back in scenario
/// order.
pub fn run_parallel<S: KineticsSolver>(
    scenarios: &[Scenario],
    workers: &[S],
    timeout: Duration,
) -> RirResult<Vec<ScenarioResult>> {
    if workers.is_empty() {
        return Err(RirError::invalid("run_parallel needs at least one worker"));
    }
    let n = workers.len();
    tracing::info!(scenarios = scenarios.len(), workers = n, "running scenarios in parallel");

    let mut indexed: Vec<(usize, ScenarioResult)> = workers
        .par_iter()
        .enumerate()
        .flat_map_iter(|(w, solver)| {
            scenarios
                .iter()
                .enumerate()
                .skip(w)
                .step_by(n)
                .map(move |(i, s)| (i, run(s, solver, timeout)))
        })
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, r)| r).collect())
}
