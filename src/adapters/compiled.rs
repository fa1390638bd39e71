//! Compile-then-run adapter for natively compiled languages

use async_trait::async_trait;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use super::{CompileOutcome, LanguageAdapter};
use crate::compiler;
use crate::languages::{Language, LanguageConfig};
use crate::runner::{CommandSpec, Runner};
use crate::workspace::Workspace;

/// Compiles the source once into the workspace binary, then runs that binary
#[derive(Debug, Clone)]
pub struct CompiledAdapter {
    language: Language,
    config: LanguageConfig,
}

impl CompiledAdapter {
    pub fn new(language: Language, config: LanguageConfig) -> Self {
        Self { language, config }
    }
}

#[async_trait]
impl LanguageAdapter for CompiledAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn extension(&self) -> &str {
        &self.config.extension
    }

    async fn compile(
        &self,
        runner: &dyn Runner,
        workspace: &Workspace,
        time_limit: Duration,
    ) -> CompileOutcome {
        let Some(template) = &self.config.compile_command else {
            return CompileOutcome::Ready;
        };
        let compile_cmd = workspace.render(template);

        info!("Compiling {} submission {}", self.language, workspace.id());
        let result = compiler::compile(runner, &compile_cmd, time_limit).await;

        if !result.success {
            return CompileOutcome::Failed(
                result
                    .message
                    .unwrap_or_else(|| "Compilation failed".to_string()),
            );
        }

        // A zero exit without an executable still leaves nothing to run
        if !fs::try_exists(workspace.binary_path()).await.unwrap_or(false) {
            return CompileOutcome::Failed(format!(
                "Compiler did not produce an executable for {}",
                self.language
            ));
        }

        debug!("Compilation succeeded for {}", workspace.id());
        CompileOutcome::Ready
    }

    fn run_command(&self, workspace: &Workspace) -> CommandSpec {
        CommandSpec::from_vec(&workspace.render(&self.config.run_command))
            .with_work_dir(workspace.root())
    }
}
