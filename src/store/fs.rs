use super::{DocumentStore, normalize_path};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Documents stored as files under a vault root directory.
///
/// Only files with the managed extension are enumerated, and directories whose
/// name starts with `.` are skipped.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    extension: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(normalize_path(path))
    }

    /// Whether a file path has the managed extension.
    pub fn is_managed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// Vault-relative form of a path inside the root, or `None` when it is
    /// outside the root or inside a hidden directory.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            let part = component.as_os_str().to_str()?;
            parts.push(part);
        }
        let (_, folders) = parts.split_last()?;
        if folders.iter().any(|p| p.starts_with('.')) {
            return None;
        }
        Some(parts.join("/"))
    }
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn read(&self, path: &str) -> StoreResult<String> {
        let full = self.full_path(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn write(&self, path: &str, content: &str) -> StoreResult<()> {
        let full = self.full_path(path);
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn enumerate(&self) -> StoreResult<Vec<String>> {
        let mut documents = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StoreError::io(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::io(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::io(&path, e))?;
                if file_type.is_dir() {
                    let hidden = entry.file_name().to_str().is_none_or(|n| n.starts_with('.'));
                    if !hidden {
                        pending.push(path);
                    }
                } else if file_type.is_file()
                    && self.is_managed(&path)
                    && let Some(relative) = self.relative_path(&path)
                {
                    documents.push(relative);
                }
            }
        }

        documents.sort();
        debug!(root = %self.root.display(), count = documents.len(), "Enumerated documents");
        Ok(documents)
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false)
    }

    async fn create_folder(&self, path: &str) -> StoreResult<()> {
        let full = self.full_path(path);
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(|e| StoreError::io(path, e))
    }
}
