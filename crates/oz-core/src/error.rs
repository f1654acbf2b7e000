use thiserror::Error;

pub type OzResult<T> = Result<T, OzError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OzError {
    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    #[error("Insufficient data: {what}")]
    InsufficientData { what: String },
}
