//! CLI error type and exit codes.

use std::process::ExitCode;

use ptu_capacity::auth::CredentialError;
use ptu_capacity::config::ConfigError;
use ptu_capacity::http::HttpError;
use ptu_capacity::logging::LoggingError;
use ptu_capacity::matrix::CsvError;
use ptu_capacity::sink::SinkError;
use ptu_capacity::ExportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("authentication failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("failed to create HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("failed to read stored capacity data: {0}")]
    Sink(#[from] SinkError),

    #[error("stored capacity data is malformed: {0}")]
    Csv(#[from] CsvError),
}

impl CliError {
    /// Process exit code: 2 for usage and configuration problems, 3 for
    /// authentication failures, 1 for everything else.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) => 2,
            CliError::Export(ExportError::Config(_)) => 2,
            CliError::Credential(_) | CliError::Export(ExportError::Authentication(_)) => 3,
            _ => 1,
        }
    }
}
