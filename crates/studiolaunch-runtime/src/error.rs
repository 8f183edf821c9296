use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a launch.
///
/// Setup failures carry the failed subprocess's exit code so the launcher
/// can exit with the same status.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Virtual environment creation failed at {} (exit code {code:?})", path.display())]
    EnvironmentCreation { path: PathBuf, code: Option<i32> },

    #[error("Install step '{step}' failed (exit code {code:?})")]
    Install { step: String, code: Option<i32> },

    #[error("Database migration failed (exit code {code:?})")]
    Migration { code: Option<i32> },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("No base Python interpreter found on PATH (tried {tried}); set STUDIOLAUNCH_PYTHON")]
    PythonNotFound { tried: String },

    #[error("Failed to install interrupt handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code to report. Subprocess failures propagate their own
    /// nonzero code; everything else (or a signal-terminated child) maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EnvironmentCreation { code, .. }
            | Self::Install { code, .. }
            | Self::Migration { code } => code.filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}
