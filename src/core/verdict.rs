use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::TestCase;
use crate::runner::RawRunOutcome;

/// Outcome of running one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    CompilationError,
    Timeout,
    RuntimeError,
    Passed,
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::CompilationError => "compilation_error",
            Verdict::Timeout => "timeout",
            Verdict::RuntimeError => "runtime_error",
            Verdict::Passed => "passed",
            Verdict::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Status of the surrounding submission record.
///
/// The engine never derives these from test outcomes; they are written by the
/// persistence adapter around an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Running => "running",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result of one test case, positionally paired with its `TestCase`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: Verdict,
    /// Raw captured stdout, untrimmed
    pub actual_output: String,
    /// Diagnostic or captured stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    /// Not measured; always 0
    pub memory_used_mb: u32,
    pub points_earned: u32,
}

impl TestResult {
    /// Result shared by every test case when compilation fails
    pub fn compilation_error(message: impl Into<String>) -> Self {
        Self {
            status: Verdict::CompilationError,
            actual_output: String::new(),
            error_message: Some(message.into()),
            execution_time_ms: 0,
            memory_used_mb: 0,
            points_earned: 0,
        }
    }

    /// Classify a finished run against its test case.
    ///
    /// First match wins: timeout, launch failure, non-zero exit, then output
    /// comparison.
    pub fn from_run(outcome: RawRunOutcome, test_case: &TestCase) -> Self {
        let RawRunOutcome {
            exit_code,
            signal,
            stdout,
            stderr,
            timed_out,
            wall_clock_ms,
            spawn_error,
        } = outcome;

        let (status, error_message) = if timed_out {
            (
                Verdict::Timeout,
                Some(format!("Time limit exceeded after {} ms", wall_clock_ms)),
            )
        } else if let Some(err) = spawn_error {
            (Verdict::RuntimeError, Some(err))
        } else if exit_code != Some(0) {
            let message = if !stderr.is_empty() {
                stderr
            } else {
                match (exit_code, signal) {
                    (Some(code), _) => format!("Process exited with code {}", code),
                    (None, Some(sig)) => format!("Process terminated by signal {}", sig),
                    (None, None) => "Process exited abnormally".to_string(),
                }
            };
            (Verdict::RuntimeError, Some(message))
        } else if compare_output(&stdout, &test_case.expected_output) {
            (Verdict::Passed, None)
        } else {
            (Verdict::Failed, None)
        };

        let points_earned = if status == Verdict::Passed {
            test_case.points
        } else {
            0
        };

        Self {
            status,
            actual_output: stdout,
            error_message,
            execution_time_ms: wall_clock_ms,
            memory_used_mb: 0,
            points_earned,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == Verdict::Passed
    }
}

/// Compare program output with expected output.
///
/// Only the outer whitespace is trimmed; everything inside must match exactly.
pub fn compare_output(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// Aggregates a caller may derive from a result array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_points: u64,
    pub max_points: u64,
    pub passed: usize,
    pub total: usize,
    /// True when any result is a compilation error
    pub failed_outright: bool,
}

impl ExecutionSummary {
    pub fn from_results(test_cases: &[TestCase], results: &[TestResult]) -> Self {
        Self {
            total_points: results.iter().map(|r| u64::from(r.points_earned)).sum(),
            max_points: test_cases.iter().map(|tc| u64::from(tc.points)).sum(),
            passed: results.iter().filter(|r| r.is_passed()).count(),
            total: results.len(),
            failed_outright: results
                .iter()
                .any(|r| r.status == Verdict::CompilationError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(expected: &str, points: u32) -> TestCase {
        TestCase {
            input: String::new(),
            expected_output: expected.to_string(),
            is_hidden: false,
            points,
            time_limit: None,
            memory_limit: None,
        }
    }

    fn exited(code: i32, stdout: &str, stderr: &str) -> RawRunOutcome {
        RawRunOutcome {
            exit_code: Some(code),
            signal: None,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            timed_out: false,
            wall_clock_ms: 12,
            spawn_error: None,
        }
    }

    #[test]
    fn test_compare_output_trims_outer_whitespace() {
        assert!(compare_output("Hello, World!\n", "Hello, World!"));
        assert!(compare_output("  42\n\n", "42"));
    }

    #[test]
    fn test_compare_output_internal_whitespace_matters() {
        assert!(!compare_output("1  2", "1 2"));
        assert!(!compare_output("a\nb", "a\r\nb"));
        assert!(!compare_output("a \nb", "a\nb"));
    }

    #[test]
    fn test_passed_awards_full_points() {
        let result =
            TestResult::from_run(exited(0, "Hello, World!\n", ""), &case("Hello, World!", 50));
        assert_eq!(result.status, Verdict::Passed);
        assert_eq!(result.points_earned, 50);
        assert_eq!(result.actual_output, "Hello, World!\n");
        assert_eq!(result.error_message, None);
        assert_eq!(result.execution_time_ms, 12);
        assert_eq!(result.memory_used_mb, 0);
    }

    #[test]
    fn test_wrong_output_is_failed() {
        let result = TestResult::from_run(exited(0, "42", ""), &case("7", 10));
        assert_eq!(result.status, Verdict::Failed);
        assert_eq!(result.points_earned, 0);
        assert_eq!(result.actual_output, "42");
    }

    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let result = TestResult::from_run(exited(3, "partial", "boom\n"), &case("partial", 10));
        assert_eq!(result.status, Verdict::RuntimeError);
        assert_eq!(result.error_message.as_deref(), Some("boom\n"));
        assert_eq!(result.points_earned, 0);
    }

    #[test]
    fn test_nonzero_exit_without_stderr() {
        let result = TestResult::from_run(exited(2, "", ""), &case("", 10));
        assert_eq!(result.status, Verdict::RuntimeError);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Process exited with code 2")
        );
    }

    #[test]
    fn test_signal_termination_is_runtime_error() {
        let mut outcome = exited(0, "", "");
        outcome.exit_code = None;
        outcome.signal = Some(11);
        let result = TestResult::from_run(outcome, &case("", 10));
        assert_eq!(result.status, Verdict::RuntimeError);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Process terminated by signal 11")
        );
    }

    #[test]
    fn test_timeout_wins_over_exit_code() {
        let mut outcome = exited(0, "tick\n", "");
        outcome.exit_code = None;
        outcome.timed_out = true;
        outcome.wall_clock_ms = 1003;
        let result = TestResult::from_run(outcome, &case("tick", 10));
        assert_eq!(result.status, Verdict::Timeout);
        assert_eq!(result.actual_output, "tick\n");
        assert_eq!(result.points_earned, 0);
    }

    #[test]
    fn test_spawn_error_is_runtime_error() {
        let outcome = RawRunOutcome {
            exit_code: None,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            wall_clock_ms: 0,
            spawn_error: Some("No such file or directory (os error 2)".to_string()),
        };
        let result = TestResult::from_run(outcome, &case("", 10));
        assert_eq!(result.status, Verdict::RuntimeError);
        assert_eq!(result.execution_time_ms, 0);
        assert!(result.error_message.unwrap().contains("os error 2"));
    }

    #[test]
    fn test_summary_flags_compilation_error() {
        let cases = vec![case("a", 10), case("b", 20)];
        let results = vec![
            TestResult::compilation_error("x"),
            TestResult::compilation_error("x"),
        ];
        let summary = ExecutionSummary::from_results(&cases, &results);
        assert!(summary.failed_outright);
        assert_eq!(summary.total_points, 0);
        assert_eq!(summary.max_points, 30);
    }

    #[test]
    fn test_summary_sums_points() {
        let cases = vec![case("a", 10), case("b", 20)];
        let results = vec![
            TestResult::from_run(exited(0, "a", ""), &cases[0]),
            TestResult::from_run(exited(0, "c", ""), &cases[1]),
        ];
        let summary = ExecutionSummary::from_results(&cases, &results);
        assert!(!summary.failed_outright);
        assert_eq!(summary.total_points, 10);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn test_summary_handles_points_beyond_u32() {
        let cases = vec![case("a", u32::MAX), case("a", 3_000_000_000)];
        let results: Vec<TestResult> = cases
            .iter()
            .map(|tc| TestResult::from_run(exited(0, "a", ""), tc))
            .collect();
        let summary = ExecutionSummary::from_results(&cases, &results);
        assert_eq!(summary.total_points, u64::from(u32::MAX) + 3_000_000_000);
        assert_eq!(summary.max_points, summary.total_points);
        assert_eq!(summary.passed, 2);
    }

    #[test]
    fn test_verdict_serde_names() {
        assert_eq!(
            serde_json::to_string(&Verdict::CompilationError).unwrap(),
            "\"compilation_error\""
        );
        assert_eq!(Verdict::RuntimeError.to_string(), "runtime_error");
        assert_eq!(SubmissionStatus::Failed.to_string(), "failed");
    }
}
