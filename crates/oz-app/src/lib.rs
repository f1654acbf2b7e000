//! Application service layer for ozonesens.
//!
//! Front ends go through this crate: it loads configurations and
//! observations, runs the EKMA and RIR analyses and stores their results.

pub mod config_service;
pub mod ekma_service;
pub mod error;
pub mod observation_service;
pub mod rir_service;
pub mod run_service;

pub use config_service::{ConfigSummary, base_dir_of, load_config, summarize};
pub use ekma_service::{EkmaOutcome, run_ekma, write_grid_csv};
pub use error::{AppError, AppResult};
pub use observation_service::{LoadedObservations, load_observations, write_observations_csv};
pub use rir_service::{RirOutcome, SweepOutcome, run_ekma_sweep, run_rir};
pub use run_service::{SavedRun, delete_run, list_runs, load_run, save_ekma, save_rir};
