//! Error types for channel handling and resolution.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid channel code '{code}': {reason}")]
    InvalidCode { code: String, reason: String },

    #[error("Invalid value '{value}' for code field {field}: expected {expected} characters")]
    InvalidField {
        field: &'static str,
        value: String,
        expected: usize,
    },

    #[error("Could not {operation} code '{code}'")]
    DerivationNotPossible {
        code: String,
        operation: &'static str,
    },

    #[error("Could not parse unit '{0}'")]
    UnitParse(String),

    #[error("Unit '{from}' is not convertible to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("Dummy '{dummy}' not supported by {calculation}")]
    UnsupportedDummy {
        dummy: String,
        calculation: &'static str,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No sampling interval available for channel '{code}'")]
    MissingSamplingInterval { code: String },

    #[error("Calculation failed: {0}")]
    Calculation(String),

    #[error("Inconsistent input channels: {0}")]
    InconsistentInputs(String),

    #[error("Codebook error: {0}")]
    Codebook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
