//! Process invocation seam
//!
//! The aggregator and the build step talk to executables only through
//! [`ProcessRunner`], so tests can script outcomes without spawning anything.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// A single program launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run
    pub program: PathBuf,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
    /// Abandon the child after this long
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Invocation of `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Set the arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a launched process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exited with status 0
    Success {
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
        /// Wall time of the whole process
        elapsed: Duration,
    },
    /// Exited with a non-zero status or was killed by a signal
    NonZeroExit {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },
    /// Still running when the timeout elapsed; the child was killed
    TimedOut {
        /// The timeout that elapsed
        after: Duration,
    },
}

impl RunOutcome {
    /// Whether the process exited with status 0
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    /// Short description of a failed outcome, `None` on success
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::NonZeroExit { code: Some(code), .. } => {
                Some(format!("exited with status {code}"))
            }
            RunOutcome::NonZeroExit { code: None, .. } => {
                Some("terminated by signal".to_string())
            }
            RunOutcome::TimedOut { after } => Some(format!("timed out after {after:?}")),
        }
    }
}

/// Launches external programs and reports how they ended
///
/// Implementations must block the caller until the child exits or the
/// invocation's timeout elapses. A program that cannot be started at all is an
/// [`Error::Spawn`](crate::Error::Spawn).
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion
    async fn run(&self, invocation: &Invocation) -> Result<RunOutcome>;
}

#[async_trait]
impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutcome> {
        (**self).run(invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("make")
            .with_args(["clean"])
            .with_working_dir("/tmp")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(inv.program, PathBuf::from("make"));
        assert_eq!(inv.args, vec!["clean".to_string()]);
        assert_eq!(inv.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(inv.timeout, Some(Duration::from_secs(5)));
        assert_eq!(inv.to_string(), "make clean");
    }

    #[test]
    fn test_outcome_failure_reason() {
        let ok = RunOutcome::Success {
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        };
        assert!(ok.is_success());
        assert_eq!(ok.failure_reason(), None);

        let failed = RunOutcome::NonZeroExit {
            code: Some(2),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.failure_reason().unwrap(), "exited with status 2");

        let timed_out = RunOutcome::TimedOut {
            after: Duration::from_secs(300),
        };
        assert_eq!(timed_out.failure_reason().unwrap(), "timed out after 300s");
    }
}
