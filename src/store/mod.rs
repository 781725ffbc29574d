//! Document storage behind the task index.
//!
//! The index never touches the file system directly; it reads, writes and
//! enumerates documents through [`DocumentStore`]. Paths are vault-relative
//! and always use `/` separators.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::StoreResult;
use async_trait::async_trait;

/// Async access to a collection of text documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full text of a document.
    async fn read(&self, path: &str) -> StoreResult<String>;

    /// Replace a document's text, creating it if needed.
    async fn write(&self, path: &str, content: &str) -> StoreResult<()>;

    /// Every managed document, sorted by path.
    async fn enumerate(&self) -> StoreResult<Vec<String>>;

    async fn exists(&self, path: &str) -> bool;

    /// Create a folder and its parents. Existing folders are fine.
    async fn create_folder(&self, path: &str) -> StoreResult<()>;
}

/// Canonical form of a vault-relative path: `/` separators, no leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

/// Parent folder of a vault-relative path, if it has one.
pub fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|p| !p.is_empty())
}
