//! CLI-specific error types and exit code mapping

use trailscope_collector::CollectorError;
use trailscope_core::error::TrailscopeError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The run finished but one or more sources failed to collect or store.
    #[error("collection incomplete: {0}")]
    PartialFailure(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from trailscope-core.
    #[error("{0}")]
    Core(#[from] TrailscopeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command / upstream error       |
    /// | 2    | Configuration or date argument error     |
    /// | 3    | Run finished with failed sources         |
    /// | 10   | IO error                                 |
    /// | 130  | Interrupted (Ctrl-C)                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(TrailscopeError::Config(_) | TrailscopeError::Range(_)) => 2,
            Self::PartialFailure(_) => 3,
            Self::Io(_) | Self::Core(TrailscopeError::Io(_)) => 10,
            Self::Core(TrailscopeError::Cancelled) => 130,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<CollectorError> for CliError {
    fn from(e: CollectorError) -> Self {
        Self::Core(e.into())
    }
}
