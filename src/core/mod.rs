//! Data model shared by the engine: requests, test cases and verdicts

pub mod types;
pub mod verdict;

pub use types::{Assignment, ExecutionLimits, ExecutionRequest, Submission, TestCase};
pub use verdict::{compare_output, ExecutionSummary, SubmissionStatus, TestResult, Verdict};
