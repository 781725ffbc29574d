use super::{DocumentStore, normalize_path};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, String>,
    folders: HashSet<String>,
    writes: HashMap<String, usize>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
}

/// In-memory document store.
///
/// Counts writes per path and can be told to fail reads or writes of chosen
/// documents, which makes it the usual collaborator in index tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, P, C>(documents: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let store = Self::new();
        for (path, content) in documents {
            store.insert(path.as_ref(), content);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a document in place without counting it as a write.
    pub fn insert(&self, path: &str, content: impl Into<String>) {
        self.lock()
            .documents
            .insert(normalize_path(path), content.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        self.lock().documents.remove(&normalize_path(path))
    }

    /// Rename a document without counting a write.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut state = self.lock();
        match state.documents.remove(&normalize_path(from)) {
            Some(content) => {
                state.documents.insert(normalize_path(to), content);
                true
            }
            None => false,
        }
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.lock().documents.get(&normalize_path(path)).cloned()
    }

    /// Number of `write` calls made for `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.lock()
            .writes
            .get(&normalize_path(path))
            .copied()
            .unwrap_or(0)
    }

    /// Make every later `read` of `path` fail with an I/O error.
    pub fn fail_reads(&self, path: &str) {
        self.lock().failing_reads.insert(normalize_path(path));
    }

    /// Make every later `write` of `path` fail with an I/O error.
    pub fn fail_writes(&self, path: &str) {
        self.lock().failing_writes.insert(normalize_path(path));
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.lock().folders.contains(&normalize_path(path))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<String> {
        let path = normalize_path(path);
        let state = self.lock();
        if state.failing_reads.contains(&path) {
            return Err(StoreError::Io {
                path: path.clone().into(),
                source: std::io::Error::other("injected read failure"),
            });
        }
        state
            .documents
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound(path))
    }

    async fn write(&self, path: &str, content: &str) -> StoreResult<()> {
        let path = normalize_path(path);
        let mut state = self.lock();
        if state.failing_writes.contains(&path) {
            return Err(StoreError::Io {
                path: path.into(),
                source: std::io::Error::other("injected write failure"),
            });
        }
        *state.writes.entry(path.clone()).or_default() += 1;
        state.documents.insert(path, content.to_string());
        Ok(())
    }

    async fn enumerate(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock().documents.keys().cloned().collect())
    }

    async fn exists(&self, path: &str) -> bool {
        self.lock().documents.contains_key(&normalize_path(path))
    }

    async fn create_folder(&self, path: &str) -> StoreResult<()> {
        self.lock().folders.insert(normalize_path(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_writes_not_inserts() {
        let store = MemoryStore::with_documents([("a.md", "one")]);
        assert_eq!(store.write_count("a.md"), 0);
        store.write("a.md", "two").await.unwrap();
        store.write("./a.md", "three").await.unwrap();
        assert_eq!(store.write_count("a.md"), 2);
        assert_eq!(store.read("a.md").await.unwrap(), "three");
    }

    #[tokio::test]
    async fn test_injected_read_failure() {
        let store = MemoryStore::with_documents([("a.md", "x")]);
        store.fail_reads("a.md");
        assert!(matches!(
            store.read("a.md").await,
            Err(StoreError::Io { .. })
        ));
        assert!(matches!(
            store.read("b.md").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
