use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIME_LIMIT_MS: u64 = 2000;
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 256;

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_MS
}

fn default_memory_limit() -> u32 {
    DEFAULT_MEMORY_LIMIT_MB
}

/// One graded (input, expected output, points) case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Stdin payload
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    /// Visibility is enforced by the API layer; the engine always runs hidden cases
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub points: u32,
    /// Per-test time limit override (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    /// Per-test memory limit override (MB, advisory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u32>,
}

/// Submission-wide limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall-clock limit per test run in milliseconds
    pub time_limit_ms: u64,
    /// Memory limit in MB (advisory only)
    pub memory_limit_mb: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }
}

impl ExecutionLimits {
    pub fn new(time_limit_ms: u64, memory_limit_mb: u32) -> Self {
        Self {
            time_limit_ms,
            memory_limit_mb,
        }
    }

    /// Effective wall-clock limit for one test case
    pub fn time_limit_for(&self, test_case: &TestCase) -> Duration {
        Duration::from_millis(test_case.time_limit.unwrap_or(self.time_limit_ms))
    }

    /// Effective (advisory) memory limit for one test case
    pub fn memory_limit_for(&self, test_case: &TestCase) -> u32 {
        test_case.memory_limit.unwrap_or(self.memory_limit_mb)
    }
}

/// Everything needed to execute one submission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    /// Declared language tag, resolved by the engine
    pub language: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub limits: ExecutionLimits,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        language: impl Into<String>,
        test_cases: Vec<TestCase>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            test_cases,
            limits,
        }
    }

    /// Build a request from assignment defaults and a submission.
    /// The submission's language, when present, overrides the assignment's.
    pub fn for_submission(
        assignment: &Assignment,
        submission: &Submission,
        test_cases: Vec<TestCase>,
    ) -> Self {
        let language = submission
            .language
            .as_deref()
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or(&assignment.language);

        Self {
            code: submission.code.clone(),
            language: language.to_string(),
            test_cases,
            limits: ExecutionLimits::new(assignment.time_limit, assignment.memory_limit),
        }
    }
}

/// Assignment-level settings supplied by the assignment collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub language: String,
    /// ms
    #[serde(default = "default_time_limit")]
    pub time_limit: u64,
    /// MB
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u32,
}

/// Submission record supplied by the submission collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}
