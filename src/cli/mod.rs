//! CLI command implementations

pub mod commands;
pub mod credentials;
pub mod error;

pub use commands::{BalanceArgs, Cli, Commands, DomainArgs, OverviewArgs, SuggestionsArgs};
pub use credentials::{CredentialSource, Credentials};
pub use error::CliError;
