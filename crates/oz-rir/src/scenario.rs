//! Scenarios handed to a solver and the outcome reported for each one.

use crate::concentration::ConcentrationTable;
use crate::error::{RirError, RirResult};
use oz_core::Real;
use std::fmt;

/// One solver input. Immutable once planned.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    id: String,
    table: ConcentrationTable,
    perturbed_species: Option<String>,
    scale_factor: Real,
}

impl Scenario {
    pub fn new(
        id: impl Into<String>,
        table: ConcentrationTable,
        perturbed_species: Option<String>,
        scale_factor: Real,
    ) -> Self {
        Self {
            id: id.into(),
            table,
            perturbed_species,
            scale_factor,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &ConcentrationTable {
        &self.table
    }

    /// Species (or group label) that was scaled, `None` for the baseline and sweep points.
    pub fn perturbed_species(&self) -> Option<&str> {
        self.perturbed_species.as_deref()
    }

    pub fn scale_factor(&self) -> Real {
        self.scale_factor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioStatus {
    Ok,
    SolverFailed,
    Timeout,
    OutputMissing,
}

impl ScenarioStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::SolverFailed => "SOLVER_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::OutputMissing => "OUTPUT_MISSING",
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one solver run.
///
/// `max_o3` is present exactly when the status is `Ok`; a failed run never
/// carries a number.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    scenario_id: String,
    status: ScenarioStatus,
    max_o3: Option<Real>,
    max_o3_time: Option<Real>,
    detail: Option<String>,
}

impl ScenarioResult {
    pub fn ok(scenario_id: impl Into<String>, max_o3: Real, max_o3_time: Option<Real>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            status: ScenarioStatus::Ok,
            max_o3: Some(max_o3),
            max_o3_time,
            detail: None,
        }
    }

    /// A failed run. Passing `ScenarioStatus::Ok` is treated as `SolverFailed`.
    pub fn failed(
        scenario_id: impl Into<String>,
        status: ScenarioStatus,
        detail: impl Into<String>,
    ) -> Self {
        let status = match status {
            ScenarioStatus::Ok => ScenarioStatus::SolverFailed,
            other => other,
        };
        Self {
            scenario_id: scenario_id.into(),
            status,
            max_o3: None,
            max_o3_time: None,
            detail: Some(detail.into()),
        }
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == ScenarioStatus::Ok
    }

    pub fn max_o3(&self) -> Option<Real> {
        self.max_o3
    }

    /// Output time at which O3 peaked, when the solver reports a time column.
    pub fn max_o3_time(&self) -> Option<Real> {
        self.max_o3_time
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// The peak O3 value, or the error matching the failure status.
    pub fn require_max_o3(&self) -> RirResult<Real> {
        let scenario_id = self.scenario_id.clone();
        match (self.status, self.max_o3) {
            (ScenarioStatus::Ok, Some(v)) => Ok(v),
            (ScenarioStatus::Timeout, _) => Err(RirError::SolverTimeout { scenario_id }),
            (ScenarioStatus::OutputMissing, _) => {
                Err(RirError::SolverOutputMissing { scenario_id })
            }
            _ => Err(RirError::SolverFailed {
                scenario_id,
                detail: self.detail.clone().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_results_carry_no_value() {
        let r = ScenarioResult::failed("NOx_plus", ScenarioStatus::Timeout, "600 s");
        assert_eq!(r.max_o3(), None);
        assert!(!r.is_ok());
        assert!(matches!(r.require_max_o3(), Err(RirError::SolverTimeout { .. })));

        let r = ScenarioResult::failed("x", ScenarioStatus::Ok, "bogus");
        assert_eq!(r.status(), ScenarioStatus::SolverFailed);
        assert!(matches!(r.require_max_o3(), Err(RirError::SolverFailed { .. })));

        let r = ScenarioResult::failed("x", ScenarioStatus::OutputMissing, "no file");
        assert!(matches!(r.require_max_o3(), Err(RirError::SolverOutputMissing { .. })));
    }

    #[test]
    fn ok_result_yields_value() {
        let r = ScenarioResult::ok("base", 58.0, Some(43200.0));
        assert_eq!(r.require_max_o3().unwrap(), 58.0);
        assert_eq!(r.max_o3_time(), Some(43200.0));
        assert_eq!(r.status().to_string(), "OK");
    }
}
