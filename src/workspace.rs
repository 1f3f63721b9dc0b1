//! Per-request working directories.
//!
//! Every request gets its own directory under the configured root, named by a
//! fresh UUID. Everything the request writes (uploads, downloads, archives)
//! lives below it and is removed when the request completes.

use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn acquire(&self) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.root).await?;

        let id = Uuid::new_v4();
        let path = self.root.join(id.to_string());
        tokio::fs::create_dir(&path).await?;

        debug!("Acquired workspace {} at {}", id, path.display());

        Ok(Workspace {
            id,
            path,
            files: Vec::new(),
            slots: 0,
            released: false,
        })
    }
}

/// A request-owned directory. Released explicitly by the pipeline; dropping an
/// unreleased workspace removes it as well, so a cancelled request still cleans up.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    files: Vec<PathBuf>,
    slots: usize,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Creates the next numbered subdirectory, one per materialized input, so
    /// inputs sharing a file name never collide.
    pub async fn next_slot(&mut self) -> Result<PathBuf> {
        let slot = self.path.join(self.slots.to_string());
        tokio::fs::create_dir(&slot).await?;
        self.slots += 1;
        Ok(slot)
    }

    pub fn track(&mut self, file: impl Into<PathBuf>) {
        self.files.push(file.into());
    }

    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(
                "Released workspace {} ({} tracked files)",
                self.id,
                self.files.len()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove dropped workspace {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
