//! File watcher for vault documents.
//!
//! Watches the vault root recursively and turns debounced file system
//! notifications into [`DocumentEvent`]s for documents with the managed
//! extension. Events in hidden directories (which also holds the snapshot)
//! are ignored.
//!
//! The debouncer only reports that a path changed, so the kind of change is
//! recovered from the file system: a path that no longer exists was deleted,
//! a path not seen before was created. A batch holding exactly one deletion
//! and one creation is reported as a rename.

use crate::store::FsStore;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};
use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info};

/// A change to one managed document. Paths are vault-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Created(String),
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

impl DocumentEvent {
    /// The path the document has after the event.
    pub fn path(&self) -> &str {
        match self {
            DocumentEvent::Created(p) | DocumentEvent::Modified(p) | DocumentEvent::Deleted(p) => p,
            DocumentEvent::Renamed { to, .. } => to,
        }
    }
}

/// Configuration for the document watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

impl From<&crate::config::WatchConfig> for WatcherConfig {
    fn from(config: &crate::config::WatchConfig) -> Self {
        Self {
            debounce_duration: Duration::from_millis(config.debounce_ms),
        }
    }
}

/// Handle to a running watcher. Dropping it stops the watcher.
pub struct DocumentWatcherHandle {
    events: tokio_mpsc::UnboundedReceiver<DocumentEvent>,
    _task_handle: tokio::task::JoinHandle<()>,
}

impl DocumentWatcherHandle {
    /// Wait for the next document event. `None` once the watcher has stopped.
    pub async fn next_event(&mut self) -> Option<DocumentEvent> {
        self.events.recv().await
    }
}

/// Start watching `store`'s root.
///
/// `known` lists the documents that already exist, so their first change is
/// reported as a modification rather than a creation.
pub fn start_document_watcher(
    store: FsStore,
    known: impl IntoIterator<Item = String>,
    config: WatcherConfig,
) -> Result<DocumentWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = tokio_mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    debouncer
        .watcher()
        .watch(store.root(), notify::RecursiveMode::Recursive)?;
    info!(root = %store.root().display(), extension = %store.extension(), "Watching vault");

    let known: HashSet<String> = known.into_iter().collect();
    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &store, known);
    });

    Ok(DocumentWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    tx: tokio_mpsc::UnboundedSender<DocumentEvent>,
    store: &FsStore,
    mut known: HashSet<String>,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                for event in classify_events(events, store, &mut known) {
                    debug!(event = ?event, "Document change detected");
                    if tx.send(event).is_err() {
                        info!("Document watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
            }
            Err(_) => {
                info!("Document watcher channel closed, stopping");
                return;
            }
        }
    }
}

fn classify_events(
    events: Vec<DebouncedEvent>,
    store: &FsStore,
    known: &mut HashSet<String>,
) -> Vec<DocumentEvent> {
    let mut seen = HashSet::new();
    let changes: Vec<DocumentEvent> = events
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .filter(|e| seen.insert(e.path.clone()))
        .filter_map(|e| classify_path(&e.path, store, known))
        .collect();
    pair_renames(changes)
}

/// Classify one changed path, updating the set of known documents.
fn classify_path(path: &Path, store: &FsStore, known: &mut HashSet<String>) -> Option<DocumentEvent> {
    if !store.is_managed(path) {
        return None;
    }
    let relative = store.relative_path(path)?;

    if path.is_file() {
        if known.insert(relative.clone()) {
            Some(DocumentEvent::Created(relative))
        } else {
            Some(DocumentEvent::Modified(relative))
        }
    } else if !path.exists() {
        known.remove(&relative);
        Some(DocumentEvent::Deleted(relative))
    } else {
        None
    }
}

/// Fold a lone deletion plus a lone creation into a rename.
fn pair_renames(changes: Vec<DocumentEvent>) -> Vec<DocumentEvent> {
    let deleted: Vec<&String> = changes
        .iter()
        .filter_map(|c| match c {
            DocumentEvent::Deleted(p) => Some(p),
            _ => None,
        })
        .collect();
    let created: Vec<&String> = changes
        .iter()
        .filter_map(|c| match c {
            DocumentEvent::Created(p) => Some(p),
            _ => None,
        })
        .collect();

    let [from] = deleted.as_slice() else {
        return changes;
    };
    let [to] = created.as_slice() else {
        return changes;
    };
    let rename = DocumentEvent::Renamed {
        from: (*from).clone(),
        to: (*to).clone(),
    };

    let mut result: Vec<DocumentEvent> = changes
        .iter()
        .filter(|c| !matches!(c, DocumentEvent::Deleted(_) | DocumentEvent::Created(_)))
        .cloned()
        .collect();
    result.push(rename);
    result
}
