use std::fmt::{self, Display};
use std::io;

/// Provides `SimError` and maps other errors to
/// convert to a `SimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// A parameter or start argument failed validation. Nothing was built.
    ConfigError(String),
    /// An agent could not be created because the population limit was reached.
    PopulationExhausted {
        kind: &'static str,
        limit: usize,
    },
    SimError(String),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CSVError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::SimError(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::SimError(error.to_string())
    }
}

impl std::error::Error for SimError {}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::ConfigError(msg) => write!(f, "Error: invalid configuration: {msg}"),
            SimError::PopulationExhausted { kind, limit } => {
                write!(f, "Error: cannot create {kind}, limit of {limit} reached")
            }
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
