//! Error types for the oz-app service layer.

use std::path::PathBuf;

/// Unified error for the CLI and any other front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Observation data error: {0}")]
    Observations(String),

    #[error("EKMA computation failed in the {0}")]
    Ekma(#[from] oz_ekma::EkmaError),

    #[error("RIR computation failed: {0}")]
    Rir(#[from] oz_rir::RirError),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<oz_project::ProjectError> for AppError {
    fn from(err: oz_project::ProjectError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<oz_results::ResultsError> for AppError {
    fn from(err: oz_results::ResultsError) -> Self {
        match err {
            oz_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
