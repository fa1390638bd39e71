//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running programs:
//! - `ProcessRunner`: spawns a child process with piped stdio and a hard
//!   wall-clock deadline
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about languages or compilation
//! - Own any state shared between runs

pub mod process;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        let args: Vec<String> = iter.cloned().collect();
        Self {
            program,
            args,
            work_dir: None,
        }
    }
}

/// Raw outcome of running a program (no verdict interpretation)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRunOutcome {
    /// Exit code, None if killed or never started
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    /// Stdout captured up to the moment the process ended
    pub stdout: String,
    /// Stderr captured up to the moment the process ended
    pub stderr: String,
    /// The deadline fired and the process was killed
    pub timed_out: bool,
    /// Wall-clock time from spawn to exit (0 if never started)
    pub wall_clock_ms: u64,
    /// OS-level failure to start or wait on the process
    pub spawn_error: Option<String>,
}

impl RawRunOutcome {
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            spawn_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Check if execution was successful (exited with code 0)
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.spawn_error.is_none() && self.exit_code == Some(0)
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command, feed it `stdin`, and kill it once `time_limit` elapses
    async fn run(&self, cmd: &CommandSpec, stdin: &str, time_limit: Duration) -> RawRunOutcome;
}

// Re-exports
pub use process::ProcessRunner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_from_vec() {
        let cmd = CommandSpec::from_vec(&[
            "g++".to_string(),
            "-O2".to_string(),
            "main.cpp".to_string(),
        ]);
        assert_eq!(cmd.program, "g++");
        assert_eq!(cmd.args, vec!["-O2", "main.cpp"]);
        assert!(cmd.work_dir.is_none());
    }

    #[test]
    fn test_spawn_failed_outcome() {
        let outcome = RawRunOutcome::spawn_failed("not found");
        assert!(!outcome.is_success());
        assert_eq!(outcome.wall_clock_ms, 0);
        assert_eq!(outcome.exit_code, None);
    }
}
