//! Per-execution scratch files
//!
//! All executions share one root directory. Each execution gets its own
//! random id and names its files after it, so concurrent submissions never
//! touch each other's files and no locking is needed.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Source file and (optional) executable belonging to one execution call.
///
/// Files are removed when the workspace is dropped, on every exit path.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    root: PathBuf,
    source_path: PathBuf,
    binary_path: PathBuf,
}

impl Workspace {
    /// Allocate a uniquely named file set under `root`, creating `root` if needed
    pub async fn allocate(root: &Path, extension: &str) -> Result<Self> {
        fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create workspace root {}", root.display()))?;

        let id = Uuid::new_v4();
        let source_path = root.join(format!("{}.{}", id, extension));
        let binary_path = root.join(format!("{}.bin", id));

        debug!("Workspace {} allocated at {}", id, source_path.display());

        Ok(Self {
            id,
            root: root.to_path_buf(),
            source_path,
            binary_path,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Where a compiler is asked to put the executable
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Materialize the submitted source on disk
    pub async fn write_source(&self, code: &str) -> Result<()> {
        fs::write(&self.source_path, code)
            .await
            .with_context(|| format!("Failed to write source {}", self.source_path.display()))
    }

    /// Substitute `{source}`, `{binary}` and `{dir}` in a command template
    pub fn render(&self, template: &[String]) -> Vec<String> {
        let source = self.source_path.to_string_lossy();
        let binary = self.binary_path.to_string_lossy();
        let dir = self.root.to_string_lossy();
        template
            .iter()
            .map(|part| {
                part.replace("{source}", &source)
                    .replace("{binary}", &binary)
                    .replace("{dir}", &dir)
            })
            .collect()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        for path in [&self.source_path, &self.binary_path] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(
                        "Failed to clean up workspace file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }
}
