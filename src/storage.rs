use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};

/// Called when a workflow record goes away, so side-state keyed on it can be dropped.
pub trait WorkflowCleanup: Send + Sync {
    fn cleanup_workflow_data(&self, server_id: &str, workflow_id: &str) -> Result<()>;
}

/// Generated images on disk, laid out as <root>/<server>/<workflow>/<file>.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn workflow_dir(&self, server_id: &str, workflow_id: &str) -> PathBuf {
        self.root
            .join(sanitize(server_id))
            .join(sanitize(workflow_id))
    }

    pub fn save_output(&self, server_id: &str, workflow_id: &str, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let dir = self.workflow_dir(server_id, workflow_id);
        std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(sanitize(filename));
        std::fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Saved {} bytes to {}", data.len(), path.display());
        Ok(path)
    }

    /// Saved files for a workflow, oldest first.
    pub fn list_outputs(&self, server_id: &str, workflow_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.workflow_dir(server_id, workflow_id);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .map(|entry| {
                let entry = entry?;
                Ok((entry.metadata()?.modified()?, entry.path()))
            })
            .collect::<std::io::Result<Vec<_>>>()
            .context("failed to list outputs")?;
        entries.sort();
        Ok(entries.into_iter().map(|(_, path)| path).collect())
    }
}

impl WorkflowCleanup for ImageStorage {
    fn cleanup_workflow_data(&self, server_id: &str, workflow_id: &str) -> Result<()> {
        let dir = self.workflow_dir(server_id, workflow_id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).with_context(|| format!("failed to remove {}", dir.display()))?;
            info!("Removed outputs in {}", dir.display());
        } else {
            debug!("Nothing to clean up in {}", dir.display());
        }
        Ok(())
    }
}

// Keeps names from escaping their directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
