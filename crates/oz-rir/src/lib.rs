//! Relative Incremental Reactivity (RIR) sensitivity harness.
//!
//! Plan perturbed scenarios around a baseline concentration table, run them
//! through a kinetics solver, and reduce the peak-O3 outcomes to one
//! normalized coefficient per species:
//!
//! ```no_run
//! use oz_rir::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), RirError> {
//! let baseline = ConcentrationTable::from_pairs([("NO", 50.0), ("NO2", 30.0)])?;
//! let solver = ExternalSolver::new(ExternalSolverConfig::new("./atchem2", "model"))?;
//! let nox = vec!["NO".to_string(), "NO2".to_string()];
//! let [minus, plus] = plan_group_perturbation(&baseline, "NOx", &nox, 0.2)?;
//!
//! let timeout = Duration::from_secs(600);
//! let base = run(&plan_baseline(&baseline), &solver, timeout);
//! let runs = SpeciesRuns {
//!     species: "NOx".into(),
//!     delta: 0.2,
//!     minus: run(&minus, &solver, timeout),
//!     plus: run(&plus, &solver, timeout),
//! };
//! let rir = reduce(&base, &[runs], None, StrategyHint::Auto, &RirConfig::default());
//! println!("{}: {:?}", rir.method, rir.coefficients);
//! # Ok(())
//! # }
//! ```

pub mod concentration;
pub mod error;
mod guard;
pub mod output;
pub mod planner;
pub mod reducer;
pub mod runner;
pub mod scenario;
pub mod solver;

pub use concentration::{ConcentrationTable, PPB_TO_MOLECULES_CM3};
pub use error::{RirError, RirResult};
pub use output::{O3Series, parse_output};
pub use planner::{
    BASELINE_ID, plan_baseline, plan_ekma_sweep, plan_group_perturbation, plan_labelled_scaling,
    plan_scaling_sequence, plan_species_perturbation, sweep_to_observations,
};
pub use reducer::{
    CORRELATION_KEYS, ReductionRun, ReductionSensitivity, RirConfig, RirMethod, SensitivityResult,
    SpeciesRuns, StrategyHint, default_fallback_coefficients, finite_difference, one_sided,
    reduce, reduce_observations, reduction_sensitivities,
};
pub use runner::{run, run_all, run_parallel};
pub use scenario::{Scenario, ScenarioResult, ScenarioStatus};
pub use solver::{ExternalSolver, ExternalSolverConfig, KineticsSolver, SolveFailure};
