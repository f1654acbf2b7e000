//! EKMA pipeline errors.

use oz_core::OzError;
use std::fmt;
use thiserror::Error;

/// Result type for EKMA operations.
pub type EkmaResult<T> = Result<T, EkmaError>;

/// Pipeline stage that produced an error. Ridge extraction cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Interpolate,
    Smooth,
    Classify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpolate => write!(f, "interpolate"),
            Self::Smooth => write!(f, "smooth"),
            Self::Classify => write!(f, "classify"),
        }
    }
}

/// Errors raised while building an isopleth surface or its ridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EkmaError {
    /// Too few or degenerate observations.
    #[error("{stage} stage: insufficient data: {what}")]
    InsufficientData { stage: Stage, what: String },

    /// Out-of-range option or malformed grid request.
    #[error("{stage} stage: invalid configuration: {what}")]
    InvalidConfiguration { stage: Stage, what: String },
}

impl EkmaError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::InsufficientData { stage, .. } | Self::InvalidConfiguration { stage, .. } => {
                *stage
            }
        }
    }

    pub(crate) fn insufficient(stage: Stage, what: impl Into<String>) -> Self {
        Self::InsufficientData {
            stage,
            what: what.into(),
        }
    }

    pub(crate) fn invalid(stage: Stage, what: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            stage,
            what: what.into(),
        }
    }
}

impl From<EkmaError> for OzError {
    fn from(err: EkmaError) -> Self {
        match err {
            EkmaError::InsufficientData { stage, what } => OzError::InsufficientData {
                what: format!("{stage}: {what}"),
            },
            EkmaError::InvalidConfiguration { stage, what } => OzError::InvalidConfiguration {
                what: format!("{stage}: {what}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_stage() {
        let err = EkmaError::insufficient(Stage::Interpolate, "fewer than 3 non-collinear observations");
        let msg = err.to_string();
        assert!(msg.starts_with("interpolate stage"));
        assert!(msg.contains("non-collinear"));
        assert_eq!(err.stage(), Stage::Interpolate);
    }

    #[test]
    fn error_to_oz_error() {
        let err = EkmaError::invalid(Stage::Smooth, "negative sigma");
        let oz: OzError = err.into();
        assert!(matches!(oz, OzError::InvalidConfiguration { .. }));
    }
}
