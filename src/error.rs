//! Error taxonomy for the launcher
//!
//! Every error is fatal: the launcher aborts instead of starting a
//! misconfigured service.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = LaunchError> = std::result::Result<T, E>;

/// Errors raised while deciding on, preparing, or performing a launch
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A required setting is missing, empty, or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The settings file could not be read or parsed
    #[error("failed to load settings from {path}: {message}")]
    Settings { path: PathBuf, message: String },

    /// A generated artifact could not be written
    #[error("failed to write {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A template could not be found or rendered
    #[error("failed to render template '{name}': {message}")]
    Template { name: String, message: String },

    /// The target program could not be executed
    #[error("failed to execute '{program}': {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        LaunchError::Configuration(message.into())
    }

    /// Short machine-readable name of the error class, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchError::Configuration(_) => "CONFIGURATION",
            LaunchError::Settings { .. } => "SETTINGS",
            LaunchError::Filesystem { .. } => "FILESYSTEM",
            LaunchError::Template { .. } => "TEMPLATE",
            LaunchError::ProcessLaunch { .. } => "PROCESS_LAUNCH",
        }
    }

    /// Process exit status for this error.
    ///
    /// A failed exec reports the OS error number when it is a valid status.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Configuration(_) | LaunchError::Settings { .. } => 2,
            LaunchError::Filesystem { .. } | LaunchError::Template { .. } => 1,
            LaunchError::ProcessLaunch { source, .. } => source
                .raw_os_error()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(1),
        }
    }
}
