//! CLI command implementations for Salvo.

pub(crate) mod comparative;
pub(crate) mod competition;

use std::error::Error;
use std::fmt;

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<salvo::tournament::ComparativeError> for CliError {
    fn from(e: salvo::tournament::ComparativeError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<salvo::tournament::CompetitionError> for CliError {
    fn from(e: salvo::tournament::CompetitionError) -> Self {
        Self::new(e.to_string())
    }
}
