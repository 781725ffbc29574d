//! Persisted, incrementally maintained index of task records.
//!
//! The index owns an in-memory table of [`TaskRecord`]s keyed by id
//! (`<path>:<line>`). It is filled either from the snapshot written by a
//! previous run or by scanning every document in the store, and then kept
//! current by per-document change, delete and rename notifications.
//!
//! Every mutation reschedules a debounced snapshot write, so a burst of edits
//! costs one write issued after the burst settles. [`TaskIndex::shutdown`]
//! flushes a pending write.
//!
//! Errors never escape the maintenance operations: a document that cannot be
//! read contributes nothing this cycle, an unreadable snapshot triggers a
//! rebuild, and a failed snapshot write leaves memory authoritative until the
//! next successful write.

pub mod debounce;
pub mod snapshot;

use crate::codec::RoleCodec;
use crate::config::{AssigneeConfig, Config, DEFAULT_SNAPSHOT_PATH, IndexConfig};
use crate::error::{IndexError, IndexResult, StoreError};
use crate::extract::{extract_document, set_checkbox};
use crate::roles::RoleTable;
use crate::store::{DocumentStore, normalize_path};
use crate::types::{DateKind, TaskRecord, TaskStatus};
use crate::watcher::DocumentEvent;
use arc_swap::ArcSwap;
use chrono::Utc;
use debounce::Debouncer;
use serde::Serialize;
use snapshot::IndexSnapshot;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of an index instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Uninitialized,
    /// Filled from the persisted snapshot.
    Loaded,
    /// First full scan in progress.
    Building,
    Ready,
    /// Full rebuild of an index that was already ready.
    Refreshing,
}

/// Where [`TaskIndex::initialize`] got its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Snapshot,
    Rebuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub records: usize,
    pub documents: usize,
    pub refreshes: u64,
    pub snapshot_writes: u64,
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Vault-relative snapshot location.
    pub snapshot_path: String,
    /// Quiet interval before a snapshot write.
    pub debounce: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            snapshot_path: DEFAULT_SNAPSHOT_PATH.to_string(),
            debounce: Duration::from_millis(1_000),
        }
    }
}

impl From<&IndexConfig> for IndexOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            snapshot_path: normalize_path(&config.snapshot_path),
            debounce: config.debounce(),
        }
    }
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    roles: ArcSwap<RoleTable>,
    assignees: AssigneeConfig,
    snapshot_path: String,
    tasks: Mutex<HashMap<String, TaskRecord>>,
    state: Mutex<IndexState>,
    refreshing: AtomicBool,
    refreshes: AtomicU64,
    snapshot_writes: AtomicU64,
    debouncer: Debouncer,
}

/// Clears the refresh flag however the refresh ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a task index. Clones share the same index.
#[derive(Clone)]
pub struct TaskIndex {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TaskIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskIndex")
            .field("state", &self.state())
            .field("records", &self.len())
            .field("snapshot_path", &self.inner.snapshot_path)
            .finish()
    }
}

impl TaskIndex {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        roles: RoleTable,
        assignees: AssigneeConfig,
        options: IndexOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                roles: ArcSwap::from_pointee(roles),
                assignees,
                snapshot_path: normalize_path(&options.snapshot_path),
                tasks: Mutex::new(HashMap::new()),
                state: Mutex::new(IndexState::Uninitialized),
                refreshing: AtomicBool::new(false),
                refreshes: AtomicU64::new(0),
                snapshot_writes: AtomicU64::new(0),
                debouncer: Debouncer::new(options.debounce),
            }),
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::new(
            store,
            RoleTable::from_config(&config.roles),
            config.assignees.clone(),
            IndexOptions::from(&config.index),
        )
    }

    fn lock_tasks(&self) -> MutexGuard<'_, HashMap<String, TaskRecord>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: IndexState) {
        let mut current = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != state {
            debug!(from = ?*current, to = ?state, "Index state change");
            *current = state;
        }
    }

    // ----- lifecycle -----

    /// Load the persisted snapshot, or rebuild from the documents when it is
    /// absent, unreadable, malformed or of another version.
    pub async fn initialize(&self) -> LoadSource {
        match snapshot::load(self.inner.store.as_ref(), &self.inner.snapshot_path).await {
            Ok(snapshot) => {
                let last_updated = snapshot.last_updated;
                let count = snapshot.tasks.len();
                {
                    let mut tasks = self.lock_tasks();
                    tasks.clear();
                    tasks.extend(snapshot.tasks.into_iter().map(|t| (t.id.clone(), t)));
                }
                self.set_state(IndexState::Loaded);
                info!(count, last_updated = %last_updated, "Loaded task index snapshot");
                self.set_state(IndexState::Ready);
                LoadSource::Snapshot
            }
            Err(e) => {
                info!(
                    path = %self.inner.snapshot_path,
                    reason = %e,
                    "Task index snapshot unavailable, rebuilding"
                );
                self.refresh().await;
                LoadSource::Rebuild
            }
        }
    }

    /// Rebuild the whole table from the store and persist it right away.
    ///
    /// Returns `false` without doing anything when a refresh is already
    /// running; that refresh will produce the same result.
    pub async fn refresh(&self) -> bool {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already running, skipping");
            return false;
        }
        let _guard = RefreshGuard(&self.inner.refreshing);

        let next = if self.state() == IndexState::Uninitialized {
            IndexState::Building
        } else {
            IndexState::Refreshing
        };
        self.set_state(next);

        let previous = std::mem::take(&mut *self.lock_tasks());
        let paths = match self.inner.store.enumerate().await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate documents");
                Vec::new()
            }
        };

        let mut failed = 0usize;
        for path in paths.iter().filter(|p| **p != self.inner.snapshot_path) {
            match self.derive(path).await {
                Ok(mut records) => {
                    for record in &mut records {
                        carry_over(record, previous.get(&record.id));
                    }
                    self.replace_document(path, records);
                }
                Err(e) => {
                    failed += 1;
                    warn!(path = %path, error = %e, "Failed to index document");
                }
            }
        }

        self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
        self.set_state(IndexState::Ready);
        info!(
            documents = paths.len(),
            failed,
            records = self.len(),
            "Task index rebuilt"
        );

        self.inner.debouncer.cancel();
        self.persist_now().await;
        true
    }

    /// Write a pending snapshot now instead of waiting for the debounce, and
    /// wait for a write that is already under way. Returns whether a write
    /// was pending.
    pub async fn shutdown(&self) -> bool {
        let pending = self.inner.debouncer.cancel();
        self.inner.debouncer.wait_running().await;
        if pending {
            self.persist_now().await;
        }
        pending
    }

    // ----- change notifications -----

    /// Re-derive the records of one document, replacing its old ones.
    /// Returns the number of records the document now has.
    pub async fn on_document_changed(&self, path: &str) -> usize {
        let path = normalize_path(path);
        if path == self.inner.snapshot_path {
            return 0;
        }
        match self.derive(&path).await {
            Ok(records) => {
                let count = self.replace_document(&path, records);
                debug!(path = %path, count, "Document reindexed");
                self.schedule_persist();
                count
            }
            Err(IndexError::Store(StoreError::NotFound(_))) => {
                debug!(path = %path, "Changed document is gone, dropping its records");
                self.on_document_deleted(&path);
                0
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to reindex document");
                self.lock_tasks().values().filter(|r| r.path == path).count()
            }
        }
    }

    /// Drop every record of a document. Returns how many were removed.
    pub fn on_document_deleted(&self, path: &str) -> usize {
        let path = normalize_path(path);
        let removed = {
            let mut tasks = self.lock_tasks();
            let before = tasks.len();
            tasks.retain(|_, r| r.path != path);
            before - tasks.len()
        };
        if removed > 0 {
            debug!(path = %path, removed, "Document records removed");
            self.schedule_persist();
        }
        removed
    }

    /// Move a document's records to its new path without re-reading it.
    /// Returns how many records moved.
    pub fn on_document_renamed(&self, new_path: &str, old_path: &str) -> usize {
        let new_path = normalize_path(new_path);
        let old_path = normalize_path(old_path);
        if new_path == old_path {
            return 0;
        }

        let now = Utc::now();
        let moved = {
            let mut tasks = self.lock_tasks();
            tasks.retain(|_, r| r.path != new_path);
            let ids: Vec<String> = tasks
                .values()
                .filter(|r| r.path == old_path)
                .map(|r| r.id.clone())
                .collect();
            for id in &ids {
                if let Some(mut record) = tasks.remove(id) {
                    record.path = new_path.clone();
                    record.id = TaskRecord::make_id(&new_path, record.line);
                    record.modified_at = now;
                    record.refresh_search_text();
                    tasks.insert(record.id.clone(), record);
                }
            }
            ids.len()
        };

        if moved > 0 {
            debug!(from = %old_path, to = %new_path, moved, "Document records moved");
            self.schedule_persist();
        }
        moved
    }

    /// Route a watcher event to the matching notification.
    pub async fn handle_event(&self, event: &DocumentEvent) {
        match event {
            DocumentEvent::Created(path) | DocumentEvent::Modified(path) => {
                self.on_document_changed(path).await;
            }
            DocumentEvent::Deleted(path) => {
                self.on_document_deleted(path);
            }
            DocumentEvent::Renamed { from, to } => {
                if self.on_document_renamed(to, from) == 0 {
                    // nothing indexed under the old name yet
                    self.on_document_changed(to).await;
                }
            }
        }
    }

    // ----- edits -----

    /// Set a task's status by rewriting its checkbox character in the document.
    ///
    /// The in-memory record is updated right away; the watcher's change
    /// notification for the write re-derives it later.
    pub async fn update_status(&self, id: &str, status: TaskStatus) -> IndexResult<TaskRecord> {
        let record = self.get(id).ok_or_else(|| IndexError::task_not_found(id))?;
        let content = self.inner.store.read(&record.path).await?;

        let current = content
            .split('\n')
            .nth(record.line)
            .ok_or_else(|| IndexError::stale(&record.path, record.line))?;
        if current.trim_end_matches('\r') != record.raw_line {
            return Err(IndexError::stale(&record.path, record.line));
        }
        let updated = set_checkbox(current, status)
            .ok_or_else(|| IndexError::stale(&record.path, record.line))?;
        let rewritten = content
            .split('\n')
            .enumerate()
            .map(|(n, line)| if n == record.line { updated.as_str() } else { line })
            .collect::<Vec<_>>()
            .join("\n");
        self.inner.store.write(&record.path, &rewritten).await?;

        let now = Utc::now();
        let result = {
            let mut tasks = self.lock_tasks();
            let entry = tasks
                .get_mut(id)
                .ok_or_else(|| IndexError::task_not_found(id))?;
            entry.status = status;
            entry.raw_line = updated.trim_end_matches('\r').to_string();
            if status == TaskStatus::Done {
                entry
                    .dates
                    .entry(DateKind::Completed)
                    .or_insert_with(|| now.date_naive());
            } else {
                entry.dates.remove(&DateKind::Completed);
            }
            entry.modified_at = now;
            entry.clone()
        };

        info!(id = %id, status = %status, "Task status updated");
        self.schedule_persist();
        Ok(result)
    }

    /// Replace the role table used for future derivations.
    pub fn set_roles(&self, roles: RoleTable) {
        info!(roles = roles.len(), "Role table replaced");
        self.inner.roles.store(Arc::new(roles));
    }

    pub fn roles(&self) -> Arc<RoleTable> {
        self.inner.roles.load_full()
    }

    // ----- queries -----

    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.lock_tasks().get(id).cloned()
    }

    /// Every record, ordered by document path then line.
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.collect(|_| true)
    }

    pub fn tasks_for_document(&self, path: &str) -> Vec<TaskRecord> {
        let path = normalize_path(path);
        self.collect(|r| r.path == path)
    }

    /// Records with at least one assignee in the given role.
    pub fn tasks_for_role(&self, role_id: &str) -> Vec<TaskRecord> {
        self.collect(|r| {
            r.role_assignments
                .iter()
                .any(|a| a.role_id == role_id && !a.assignees.is_empty())
        })
    }

    /// Records naming `token` in any role.
    pub fn tasks_for_assignee(&self, token: &str) -> Vec<TaskRecord> {
        self.collect(|r| r.assignees().any(|a| a == token))
    }

    fn collect(&self, keep: impl Fn(&TaskRecord) -> bool) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = self
            .lock_tasks()
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
        records
    }

    pub fn len(&self) -> usize {
        self.lock_tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_tasks().is_empty()
    }

    pub fn state(&self) -> IndexState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> IndexStats {
        let (records, documents) = {
            let tasks = self.lock_tasks();
            let documents: HashSet<&str> = tasks.values().map(|r| r.path.as_str()).collect();
            (tasks.len(), documents.len())
        };
        IndexStats {
            records,
            documents,
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
            snapshot_writes: self.inner.snapshot_writes.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot_path(&self) -> &str {
        &self.inner.snapshot_path
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    // ----- internals -----

    async fn derive(&self, path: &str) -> IndexResult<Vec<TaskRecord>> {
        let content = self.inner.store.read(path).await?;
        let roles = self.inner.roles.load_full();
        let codec = RoleCodec::new(&roles, &self.inner.assignees);
        Ok(extract_document(&codec, path, &content, Utc::now()))
    }

    /// Delete-then-insert the records of one document.
    fn replace_document(&self, path: &str, mut records: Vec<TaskRecord>) -> usize {
        let mut tasks = self.lock_tasks();
        let old_ids: Vec<String> = tasks
            .values()
            .filter(|r| r.path == path)
            .map(|r| r.id.clone())
            .collect();
        let old: HashMap<String, TaskRecord> = old_ids
            .iter()
            .filter_map(|id| tasks.remove_entry(id))
            .collect();

        for record in &mut records {
            carry_over(record, old.get(&record.id));
        }
        let count = records.len();
        tasks.extend(records.into_iter().map(|r| (r.id.clone(), r)));
        count
    }

    fn schedule_persist(&self) {
        let index = self.clone();
        self.inner.debouncer.schedule(async move {
            index.persist_now().await;
        });
    }

    async fn persist_now(&self) -> bool {
        let snapshot = IndexSnapshot::new(self.tasks());
        match snapshot::save(self.inner.store.as_ref(), &self.inner.snapshot_path, &snapshot).await {
            Ok(()) => {
                self.inner.snapshot_writes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    path = %self.inner.snapshot_path,
                    count = snapshot.tasks.len(),
                    "Task index snapshot written"
                );
                true
            }
            Err(e) => {
                warn!(path = %self.inner.snapshot_path, error = %e, "Failed to write task index snapshot");
                false
            }
        }
    }
}

/// Keep the timestamps of an unchanged line.
fn carry_over(record: &mut TaskRecord, previous: Option<&TaskRecord>) {
    if let Some(previous) = previous
        && previous.raw_line == record.raw_line
    {
        record.created_at = previous.created_at;
        record.modified_at = previous.modified_at;
    }
}
