//! Compiler module - Source code compilation
//!
//! Runs a compiler command once per submission through a `Runner` and turns
//! its outcome into a success flag plus a diagnostic message.

use std::time::Duration;
use tracing::debug;

use crate::runner::{CommandSpec, Runner};

/// Result of a compilation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CompileResult {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
        }
    }
}

/// Compile with `compile_cmd`, bounded by `time_limit`
pub async fn compile(
    runner: &dyn Runner,
    compile_cmd: &[String],
    time_limit: Duration,
) -> CompileResult {
    if compile_cmd.is_empty() {
        return CompileResult::ok();
    }

    debug!("Compiling with {:?}", compile_cmd);

    let cmd = CommandSpec::from_vec(compile_cmd);
    let outcome = runner.run(&cmd, "", time_limit).await;

    if outcome.is_success() {
        return CompileResult::ok();
    }

    let error_msg = if outcome.timed_out {
        "Compilation timed out".to_string()
    } else if let Some(err) = outcome.spawn_error {
        format!("Failed to launch compiler: {}", err)
    } else if !outcome.stderr.is_empty() {
        outcome.stderr
    } else if !outcome.stdout.is_empty() {
        outcome.stdout
    } else {
        match (outcome.exit_code, outcome.signal) {
            (Some(code), _) => format!("Compilation failed with exit code {}", code),
            (None, Some(_)) => "Compiler crashed".to_string(),
            (None, None) => "Compilation failed".to_string(),
        }
    };

    CompileResult::failed(error_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessRunner;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_successful_compile() {
        let runner = ProcessRunner::default();
        let result = compile(&runner, &sh("exit 0"), Duration::from_secs(5)).await;
        assert_eq!(result, CompileResult::ok());
    }

    #[tokio::test]
    async fn test_failure_prefers_stderr() {
        let runner = ProcessRunner::default();
        let result = compile(
            &runner,
            &sh("echo 'note' ; echo \"main.c:1: error: expected ';'\" >&2; exit 1"),
            Duration::from_secs(5),
        )
        .await;
        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("main.c:1: error: expected ';'\n")
        );
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_stdout_then_exit_code() {
        let runner = ProcessRunner::default();
        let result = compile(&runner, &sh("echo broken; exit 1"), Duration::from_secs(5)).await;
        assert_eq!(result.message.as_deref(), Some("broken\n"));

        let result = compile(&runner, &sh("exit 4"), Duration::from_secs(5)).await;
        assert_eq!(
            result.message.as_deref(),
            Some("Compilation failed with exit code 4")
        );
    }

    #[tokio::test]
    async fn test_compile_timeout() {
        let runner = ProcessRunner::default();
        let result = compile(&runner, &sh("sleep 10"), Duration::from_millis(200)).await;
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Compilation timed out"));
    }

    #[tokio::test]
    async fn test_missing_compiler() {
        let runner = ProcessRunner::default();
        let cmd = vec!["/nonexistent/cc".to_string(), "main.c".to_string()];
        let result = compile(&runner, &cmd, Duration::from_secs(1)).await;
        assert!(!result.success);
        assert!(result
            .message
            .unwrap()
            .starts_with("Failed to launch compiler:"));
    }
}
