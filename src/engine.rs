//! Execution engine
//!
//! Accepts a request, enforces the global concurrency cap, drives the
//! language adapter across all test cases and hands the results to the
//! persistence hook.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::adapters::{self, AdapterRegistry};
use crate::config::EngineConfig;
use crate::core::{ExecutionRequest, ExecutionSummary, TestResult};
use crate::error::ExecutionError;
use crate::languages::{Language, LanguageTable};
use crate::runner::{ProcessRunner, Runner};
use crate::storage::ResultSink;
use crate::workspace::Workspace;

pub struct ExecutionEngine {
    config: EngineConfig,
    adapters: AdapterRegistry,
    runner: Arc<dyn Runner>,
    /// One permit per allowed in-flight execution
    slots: Arc<Semaphore>,
}

impl ExecutionEngine {
    /// Engine with the production process runner
    pub fn new(config: EngineConfig, table: &LanguageTable) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.output_limit_bytes));
        Self::with_parts(config, AdapterRegistry::from_table(table), runner)
    }

    pub fn with_parts(
        config: EngineConfig,
        adapters: AdapterRegistry,
        runner: Arc<dyn Runner>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config,
            adapters,
            runner,
            slots,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    /// Slots not currently held by an execution
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Execute one submission attempt.
    ///
    /// Returns one result per test case, in order, or a rejection before any
    /// work started. Nothing is cached between calls.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<Vec<TestResult>, ExecutionError> {
        let language: Language = request.language.parse()?;
        let adapter = self
            .adapters
            .get(language)
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(request.language.clone()))?;

        // Dropped on every exit path, which frees the slot
        let _permit = Arc::clone(&self.slots).try_acquire_owned().map_err(|_| {
            warn!(
                "Execution rejected: {} executions already in flight (language={})",
                self.config.max_concurrent, language
            );
            ExecutionError::ResourceExhausted {
                limit: self.config.max_concurrent,
            }
        })?;

        let started = Instant::now();
        let workspace =
            Workspace::allocate(&self.config.workspace_root, adapter.extension()).await?;

        info!(
            "Starting execution {}: language={}, test_cases={}, time_limit={}ms",
            workspace.id(),
            language,
            request.test_cases.len(),
            request.limits.time_limit_ms
        );

        let results = adapters::run_submission(
            adapter.as_ref(),
            self.runner.as_ref(),
            &workspace,
            &request.code,
            &request.test_cases,
            &request.limits,
            Duration::from_millis(self.config.compile_time_limit_ms),
        )
        .await?;

        let summary = ExecutionSummary::from_results(&request.test_cases, &results);
        info!(
            "Execution {} completed: passed={}/{}, score={}/{}, compilation_failed={}, took {}ms",
            workspace.id(),
            summary.passed,
            summary.total,
            summary.total_points,
            summary.max_points,
            summary.failed_outright,
            started.elapsed().as_millis()
        );

        Ok(results)
    }

    /// Execute, then persist the full result array once
    pub async fn execute_and_save(
        &self,
        submission_id: i64,
        request: &ExecutionRequest,
        sink: &dyn ResultSink,
    ) -> Result<Vec<TestResult>, ExecutionError> {
        let results = self.execute(request).await?;
        sink.save_results(submission_id, &request.test_cases, &results)
            .await
            .map_err(ExecutionError::Persistence)?;
        Ok(results)
    }
}
