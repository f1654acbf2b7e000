//! Error types for the sensitivity path.

use oz_core::OzError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RirError {
    #[error("Unknown species: {name}")]
    UnknownSpecies { name: String },

    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    #[error("Scenario {scenario_id}: solver failed ({detail})")]
    SolverFailed { scenario_id: String, detail: String },

    #[error("Scenario {scenario_id}: solver timed out")]
    SolverTimeout { scenario_id: String },

    #[error("Scenario {scenario_id}: solver output missing")]
    SolverOutputMissing { scenario_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RirResult<T> = Result<T, RirError>;

impl RirError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidConfiguration { what: what.into() }
    }

    pub(crate) fn unknown(name: &str) -> Self {
        Self::UnknownSpecies {
            name: name.to_string(),
        }
    }
}

impl From<RirError> for OzError {
    fn from(e: RirError) -> Self {
        match e {
            RirError::UnknownSpecies { name } => OzError::InvalidConfiguration {
                what: format!("unknown species {name}"),
            },
            RirError::InvalidConfiguration { what } => OzError::InvalidConfiguration { what },
            other => OzError::InsufficientData {
                what: other.to_string(),
            },
        }
    }
}
