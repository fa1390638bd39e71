//! Engine configuration
//!
//! Defaults can be overridden through environment variables (a `.env` file is
//! honoured).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::runner::process::DEFAULT_OUTPUT_LIMIT_BYTES;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_COMPILE_TIME_LIMIT_MS: u64 = 30_000;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of in-flight executions (default: 5)
    pub max_concurrent: usize,
    /// Shared scratch directory for per-execution files
    pub workspace_root: PathBuf,
    /// Compile time limit in milliseconds (default: 30000ms = 30s)
    pub compile_time_limit_ms: u64,
    /// Per-stream cap on captured output
    pub output_limit_bytes: usize,
    /// Language table override; the embedded table is used when None
    pub languages_config: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            workspace_root: std::env::temp_dir().join("code-exec"),
            compile_time_limit_ms: DEFAULT_COMPILE_TIME_LIMIT_MS,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            languages_config: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            max_concurrent: env_or("EXEC_MAX_CONCURRENT", defaults.max_concurrent)?,
            workspace_root: std::env::var("EXEC_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            compile_time_limit_ms: env_or(
                "EXEC_COMPILE_TIME_LIMIT_MS",
                defaults.compile_time_limit_ms,
            )?,
            output_limit_bytes: env_or("EXEC_OUTPUT_LIMIT_BYTES", defaults.output_limit_bytes)?,
            languages_config: std::env::var("LANGUAGES_CONFIG").ok().map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        if self.compile_time_limit_ms == 0 {
            anyhow::bail!("compile_time_limit_ms must be positive");
        }
        Ok(())
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_compile_time_limit_ms(mut self, limit: u64) -> Self {
        self.compile_time_limit_ms = limit;
        self
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        Err(_) => Ok(default),
    }
}
