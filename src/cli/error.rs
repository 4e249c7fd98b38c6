//! CLI error types and conversions

use crate::gateway::config::ConfigError;
use crate::gateway::error::ApiError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// API call failed
    #[error("API request failed ({})", .0.kind().as_str())]
    ApiError(#[from] ApiError),

    /// Configuration rejected
    #[error("invalid client configuration")]
    ConfigError(#[from] ConfigError),

    /// Output error
    #[error("could not write results")]
    OutputError(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl CliError {
    /// Hint for the user, when the error has one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::ApiError(err) => Some(err.user_hint()),
            CliError::ConfigurationError(_) => {
                Some("pass --login/--password or set DATAFORSEO_LOGIN and DATAFORSEO_PASSWORD")
            }
            _ => None,
        }
    }
}
