//! Direct-run adapter for interpreted languages

use async_trait::async_trait;
use std::time::Duration;

use super::{CompileOutcome, LanguageAdapter};
use crate::languages::{Language, LanguageConfig};
use crate::runner::{CommandSpec, Runner};
use crate::workspace::Workspace;

/// Hands the source file straight to an interpreter
#[derive(Debug, Clone)]
pub struct InterpretedAdapter {
    language: Language,
    config: LanguageConfig,
}

impl InterpretedAdapter {
    pub fn new(language: Language, config: LanguageConfig) -> Self {
        Self { language, config }
    }
}

#[async_trait]
impl LanguageAdapter for InterpretedAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn extension(&self) -> &str {
        &self.config.extension
    }

    async fn compile(
        &self,
        _runner: &dyn Runner,
        _workspace: &Workspace,
        _time_limit: Duration,
    ) -> CompileOutcome {
        CompileOutcome::Ready
    }

    fn run_command(&self, workspace: &Workspace) -> CommandSpec {
        CommandSpec::from_vec(&workspace.render(&self.config.run_command))
            .with_work_dir(workspace.root())
    }
}
