//! Language adapters
//!
//! Each supported language is a thin strategy object with three steps:
//! prepare (write the source), compile (optional), and run (one command per
//! test case). Two shapes exist: `CompiledAdapter` and `InterpretedAdapter`.

pub mod compiled;
pub mod interpreted;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{ExecutionLimits, TestCase, TestResult};
use crate::languages::{Language, LanguageTable};
use crate::runner::{CommandSpec, Runner};
use crate::workspace::Workspace;

pub use compiled::CompiledAdapter;
pub use interpreted::InterpretedAdapter;

/// Outcome of the compile step
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    /// Ready to run (compiled, or nothing to compile)
    Ready,
    /// Compilation failed with this diagnostic
    Failed(String),
}

#[async_trait]
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Source file extension without the dot
    fn extension(&self) -> &str;

    /// Materialize the source inside the workspace
    async fn prepare(&self, workspace: &Workspace, code: &str) -> Result<()> {
        workspace.write_source(code).await
    }

    async fn compile(
        &self,
        runner: &dyn Runner,
        workspace: &Workspace,
        time_limit: Duration,
    ) -> CompileOutcome;

    /// Command that runs the prepared program once
    fn run_command(&self, workspace: &Workspace) -> CommandSpec;
}

/// Prepare, compile once, then run every test case in order.
///
/// Always returns one result per test case. Only workspace I/O failures are
/// errors.
pub async fn run_submission(
    adapter: &dyn LanguageAdapter,
    runner: &dyn Runner,
    workspace: &Workspace,
    code: &str,
    test_cases: &[TestCase],
    limits: &ExecutionLimits,
    compile_time_limit: Duration,
) -> Result<Vec<TestResult>> {
    adapter.prepare(workspace, code).await?;

    if let CompileOutcome::Failed(message) =
        adapter.compile(runner, workspace, compile_time_limit).await
    {
        debug!(
            "Compilation failed for {} ({}); reporting it on all {} test cases",
            workspace.id(),
            adapter.language(),
            test_cases.len()
        );
        return Ok(vec![TestResult::compilation_error(message); test_cases.len()]);
    }

    let cmd = adapter.run_command(workspace);
    let mut results = Vec::with_capacity(test_cases.len());

    for (idx, tc) in test_cases.iter().enumerate() {
        debug!(
            "Running test case {} for {} (memory limit {}MB, not enforced)",
            idx + 1,
            workspace.id(),
            limits.memory_limit_for(tc)
        );

        let outcome = runner.run(&cmd, &tc.input, limits.time_limit_for(tc)).await;
        let result = TestResult::from_run(outcome, tc);

        debug!(
            "Test case {}: {} in {}ms",
            idx + 1,
            result.status,
            result.execution_time_ms
        );
        results.push(result);
    }

    Ok(results)
}

/// One adapter per configured language
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Language, Arc<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Build adapters from a language table; the shape follows whether the
    /// language has a compile command
    pub fn from_table(table: &LanguageTable) -> Self {
        let mut registry = Self::default();
        for (language, config) in table.iter() {
            let adapter: Arc<dyn LanguageAdapter> = if config.is_compiled() {
                Arc::new(CompiledAdapter::new(*language, config.clone()))
            } else {
                Arc::new(InterpretedAdapter::new(*language, config.clone()))
            };
            registry.register(adapter);
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters.get(&language).cloned()
    }
}
