//! Error types for build domain

use thiserror::Error;

use super::types::{ImageKind, Phase};
use crate::remote::RemoteError;

/// Result type for build operations
pub type BuildResult<T = ()> = std::result::Result<T, BuildError>;

/// Errors that can occur while running a build job
#[derive(Error, Debug)]
pub enum BuildError {
    /// The step descriptor for a phase could not be produced
    #[error("Failed to prepare {phase} step: {reason}")]
    Setup {
        /// Phase whose step could not be generated.
        phase: Phase,
        /// Reason reported by the step provider.
        reason: String,
    },

    /// A step ran and failed
    #[error("Step for {image} failed{}: {message}", exit_suffix(.code))]
    StepFailed {
        /// Image the step was executed with.
        image: ImageKind,
        /// Exit code, when the step got far enough to produce one.
        code: Option<i32>,
        /// Error message describing the failure.
        message: String,
    },

    /// The job selected a plugin nobody registered
    #[error("Plugin '{name}' is not registered")]
    PluginNotFound {
        /// The plugin name that was looked up.
        name: String,
    },

    /// A plugin was registered twice under the same name
    #[error("Plugin '{name}' is already registered")]
    DuplicatePlugin {
        /// The conflicting plugin name.
        name: String,
    },

    /// Job or plugin configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The abort signal fired
    #[error("Build was cancelled")]
    Cancelled,

    /// Remote transport failure
    #[error("Remote execution failed: {0}")]
    Remote(RemoteError),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}")).unwrap_or_default()
}

impl BuildError {
    /// Returns true if this error reports an interruption rather than a failure
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if this error comes from misconfiguration
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::PluginNotFound { .. } | Self::DuplicatePlugin { .. } | Self::Config(_)
        )
    }

    /// Wraps a remote error raised while running a step with the given image
    #[must_use]
    pub fn from_remote(image: ImageKind, err: RemoteError) -> Self {
        match err {
            RemoteError::Cancelled => Self::Cancelled,
            RemoteError::ExitStatus { code } => Self::StepFailed {
                image,
                code: i32::try_from(code).ok(),
                message: "remote command returned a non-zero status".to_string(),
            },
            other => Self::Remote(other),
        }
    }
}

impl From<RemoteError> for BuildError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Cancelled => Self::Cancelled,
            other => Self::Remote(other),
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
