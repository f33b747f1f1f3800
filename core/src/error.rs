//! Error types for amdahl-bench-core

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
///
/// Only conditions that stop the harness live here. A benchmark run that
/// exits non-zero or times out is reported as a [`RunOutcome`](crate::RunOutcome),
/// and malformed output lines are reported as [`ParseIssue`](crate::ParseIssue).
#[derive(Error, Debug)]
pub enum Error {
    /// A build command failed; nothing else may run
    #[error("build command `{command}` failed: {reason}")]
    Build {
        /// The command line that failed
        command: String,
        /// Exit status or spawn error
        reason: String,
    },

    /// The executable could not be started at all
    #[error("failed to spawn `{}`: {source}", program.display())]
    Spawn {
        /// Program that was being launched
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
