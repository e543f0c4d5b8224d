// /src/errors.rs
//! Error types for reconciliation. Nothing in the engine panics on bad input;
//! identity problems abort the cycle, rebuild problems are contained.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Duplicate identity '{identity}' under parent '{parent}'")]
    DuplicateIdentity { identity: String, parent: String },

    #[error("Invalid key: {0}")]
    Key(#[from] KeyError),

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("Reconciliation already in progress")]
    InFlight,

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[cfg(feature = "python")]
    #[error("Python call failed: {0}")]
    PythonError(String),
}

/// A value that cannot serve as an identity key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("null cannot be used as a key")]
    Null,

    #[error("key value {value} could not be made hashable")]
    Unhashable { value: String },
}

/// Raised by a stateful node's build hook. The failing subtree renders
/// nothing for the cycle; siblings are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BuildError {
    message: String,
}

impl BuildError {
    pub fn new(message: impl Into<String>) -> Self {
        BuildError { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "python")]
impl From<ReconcilerError> for pyo3::PyErr {
    fn from(err: ReconcilerError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for ReconcilerError {
    fn from(err: pyo3::PyErr) -> Self {
        ReconcilerError::PythonError(err.to_string())
    }
}
