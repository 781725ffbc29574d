//! Integration tests for the task index.
//!
//! Most tests run against the in-memory store; timing tests use tokio's
//! paused clock so debounce windows elapse instantly.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use task_roles::config::AssigneeConfig;
use task_roles::error::{IndexError, StoreResult};
use task_roles::index::snapshot::IndexSnapshot;
use task_roles::index::{IndexOptions, IndexState, LoadSource, TaskIndex};
use task_roles::roles::RoleTable;
use task_roles::store::{DocumentStore, FsStore, MemoryStore};
use task_roles::types::{DateKind, TaskStatus};
use task_roles::watcher::DocumentEvent;

const SNAPSHOT: &str = ".task-roles/task-index.json";

/// Helper to create an index over an in-memory store holding `docs`.
fn setup_index(docs: &[(&str, &str)]) -> (Arc<MemoryStore>, TaskIndex) {
    let store = Arc::new(MemoryStore::with_documents(docs.iter().copied()));
    let index = TaskIndex::new(
        store.clone(),
        RoleTable::default(),
        AssigneeConfig::default(),
        IndexOptions::default(),
    );
    (store, index)
}

fn ids(index: &TaskIndex) -> Vec<String> {
    index.tasks().into_iter().map(|t| t.id).collect()
}

/// Store whose reads (and optionally writes) take a while, so overlapping
/// calls can be observed.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
    write_delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn read(&self, path: &str) -> StoreResult<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, content: &str) -> StoreResult<()> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.write(path, content).await
    }

    async fn enumerate(&self) -> StoreResult<Vec<String>> {
        self.inner.enumerate().await
    }

    async fn exists(&self, path: &str) -> bool {
        self.inner.exists(path).await
    }

    async fn create_folder(&self, path: &str) -> StoreResult<()> {
        self.inner.create_folder(path).await
    }
}

mod consistency_tests {
    use super::*;

    #[tokio::test]
    async fn changed_document_yields_one_record_per_task_line() {
        let (store, index) = setup_index(&[]);
        store.insert("notes/plan.md", "- [ ] one\n- [ ] two");

        let count = index.on_document_changed("notes/plan.md").await;

        assert_eq!(count, 2);
        assert_eq!(ids(&index), vec!["notes/plan.md:0", "notes/plan.md:1"]);
    }

    #[tokio::test]
    async fn change_replaces_all_records_of_the_document() {
        let (store, index) = setup_index(&[
            ("a.md", "- [ ] one\n- [ ] two\n- [ ] three"),
            ("b.md", "- [ ] other"),
        ]);
        index.refresh().await;
        assert_eq!(index.len(), 4);

        store.insert("a.md", "intro\n- [x] two");
        index.on_document_changed("a.md").await;

        assert_eq!(ids(&index), vec!["a.md:1", "b.md:0"]);
        assert_eq!(index.get("a.md:1").unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn delete_removes_every_record_of_the_document() {
        let (_store, index) = setup_index(&[
            ("a.md", "- [ ] one\n- [ ] two"),
            ("ab.md", "- [ ] keep"),
        ]);
        index.refresh().await;

        assert_eq!(index.on_document_deleted("a.md"), 2);
        assert!(index.tasks_for_document("a.md").is_empty());
        assert_eq!(ids(&index), vec!["ab.md:0"]);
    }

    #[tokio::test]
    async fn rename_moves_records_without_rereading() {
        let (store, index) = setup_index(&[("old/a.md", "- [ ] one [🚗:: @Jo]\n- [ ] two")]);
        index.refresh().await;
        let before = index.get("old/a.md:0").unwrap();

        // the store no longer has either path; records must move anyway
        store.remove("old/a.md");
        let moved = index.on_document_renamed("new/a.md", "old/a.md");

        assert_eq!(moved, 2);
        assert_eq!(ids(&index), vec!["new/a.md:0", "new/a.md:1"]);
        let after = index.get("new/a.md:0").unwrap();
        assert_eq!(after.path, "new/a.md");
        assert_eq!(after.role_assignments, before.role_assignments);
        assert!(after.modified_at >= before.modified_at);
        assert!(after.search_text.contains("new/a.md"));
    }

    #[tokio::test]
    async fn rename_event_for_unknown_document_indexes_it() {
        let (store, index) = setup_index(&[]);
        store.insert("fresh.md", "- [ ] hello");

        index
            .handle_event(&DocumentEvent::Renamed {
                from: "elsewhere.md".to_string(),
                to: "fresh.md".to_string(),
            })
            .await;

        assert_eq!(ids(&index), vec!["fresh.md:0"]);
    }

    #[tokio::test]
    async fn events_route_to_notifications() {
        let (store, index) = setup_index(&[]);
        store.insert("a.md", "- [ ] one");
        index.handle_event(&DocumentEvent::Created("a.md".to_string())).await;
        assert_eq!(index.len(), 1);

        store.insert("a.md", "- [ ] one\n- [ ] two");
        index.handle_event(&DocumentEvent::Modified("a.md".to_string())).await;
        assert_eq!(index.len(), 2);

        index.handle_event(&DocumentEvent::Deleted("a.md".to_string())).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn queries_by_role_and_assignee() {
        let (_store, index) = setup_index(&[(
            "a.md",
            "- [ ] one [🚗:: [[People/Jo|@Jo]]]\n- [ ] two [👍:: [[People/Jo|@Jo]]] [📢:: +Acme]\n- [ ] three",
        )]);
        index.refresh().await;

        let drivers: Vec<String> = index.tasks_for_role("drivers").into_iter().map(|t| t.id).collect();
        assert_eq!(drivers, vec!["a.md:0"]);
        assert_eq!(index.tasks_for_assignee("@Jo").len(), 2);
        assert_eq!(index.tasks_for_assignee("+Acme").len(), 1);
        assert_eq!(index.stats().documents, 1);
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn corrupt_snapshot_triggers_exactly_one_rebuild() {
        let docs = [("a.md", "- [ ] one\n- [x] two"), ("b/c.md", "- [/] three")];
        let (store, index) = setup_index(&docs);
        store.insert(SNAPSHOT, "{ not json");

        let source = index.initialize().await;

        assert_eq!(source, LoadSource::Rebuild);
        assert_eq!(index.state(), IndexState::Ready);
        assert_eq!(index.stats().refreshes, 1);

        let (_fresh_store, fresh) = setup_index(&docs);
        fresh.refresh().await;
        assert_eq!(ids(&index), ids(&fresh));
        let raw: Vec<String> = index.tasks().into_iter().map(|t| t.raw_line).collect();
        let fresh_raw: Vec<String> = fresh.tasks().into_iter().map(|t| t.raw_line).collect();
        assert_eq!(raw, fresh_raw);
    }

    #[tokio::test]
    async fn missing_or_outdated_snapshot_rebuilds() {
        let (_store, index) = setup_index(&[("a.md", "- [ ] one")]);
        assert_eq!(index.initialize().await, LoadSource::Rebuild);

        let (store, index) = setup_index(&[("a.md", "- [ ] one")]);
        store.insert(
            SNAPSHOT,
            r#"{"version": 0, "lastUpdated": "2024-01-01T00:00:00Z", "tasks": []}"#,
        );
        assert_eq!(index.initialize().await, LoadSource::Rebuild);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn valid_snapshot_loads_without_scanning() {
        let (store, first) = setup_index(&[("a.md", "- [ ] one [🚗:: @Jo]")]);
        first.refresh().await;
        assert_eq!(store.write_count(SNAPSHOT), 1);

        let second = TaskIndex::new(
            store.clone(),
            RoleTable::default(),
            AssigneeConfig::default(),
            IndexOptions::default(),
        );
        assert_eq!(second.initialize().await, LoadSource::Snapshot);
        assert_eq!(second.state(), IndexState::Ready);
        assert_eq!(second.stats().refreshes, 0);
        assert_eq!(second.get("a.md:0"), first.get("a.md:0"));
    }

    #[tokio::test]
    async fn unreadable_document_does_not_stop_the_scan() {
        let (store, index) = setup_index(&[
            ("a.md", "- [ ] one"),
            ("b.md", "- [ ] broken"),
            ("c.md", "- [ ] three"),
        ]);
        store.fail_reads("b.md");

        assert!(index.refresh().await);

        assert_eq!(ids(&index), vec!["a.md:0", "c.md:0"]);
        assert_eq!(index.state(), IndexState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refresh_is_skipped() {
        let inner = MemoryStore::with_documents([("a.md", "- [ ] one"), ("b.md", "- [ ] two")]);
        let store = Arc::new(SlowStore {
            inner,
            delay: Duration::from_millis(50),
            write_delay: Duration::ZERO,
        });
        let index = TaskIndex::new(
            store,
            RoleTable::default(),
            AssigneeConfig::default(),
            IndexOptions::default(),
        );

        let (first, second) = tokio::join!(index.refresh(), index.refresh());

        assert!(first);
        assert!(!second);
        assert_eq!(index.stats().refreshes, 1);
        assert_eq!(index.len(), 2);

        // the flag is released once the refresh finishes
        assert!(index.refresh().await);
        assert_eq!(index.stats().refreshes, 2);
    }

    #[tokio::test]
    async fn snapshot_write_failure_keeps_memory_authoritative() {
        let (store, index) = setup_index(&[("a.md", "- [ ] one")]);
        store.fail_writes(SNAPSHOT);

        assert!(index.refresh().await);

        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().snapshot_writes, 0);
        assert_eq!(index.state(), IndexState::Ready);
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/a.md"), "- [ ] one\n- [ ] two\n").unwrap();

        let open = || {
            TaskIndex::new(
                Arc::new(FsStore::new(dir.path(), "md")),
                RoleTable::default(),
                AssigneeConfig::default(),
                IndexOptions::default(),
            )
        };

        let first = open();
        assert_eq!(first.initialize().await, LoadSource::Rebuild);
        assert!(dir.path().join(SNAPSHOT).is_file());

        let second = open();
        assert_eq!(second.initialize().await, LoadSource::Snapshot);
        assert_eq!(ids(&second), vec!["notes/a.md:0", "notes/a.md:1"]);
    }
}

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn update_status_rewrites_one_character() {
        let (store, index) = setup_index(&[("a.md", "- [ ] one 📅 2024-01-01\n- [ ] two")]);
        index.refresh().await;

        let record = index
            .update_status("a.md:0", TaskStatus::Done)
            .await
            .expect("update failed");

        assert_eq!(
            store.contents("a.md").unwrap(),
            "- [x] one 📅 2024-01-01\n- [ ] two"
        );
        assert_eq!(store.write_count("a.md"), 1);
        assert_eq!(record.status, TaskStatus::Done);
        assert!(record.dates.contains_key(&DateKind::Completed));
        assert_eq!(index.get("a.md:0").unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn reopening_clears_completion_date() {
        let (_store, index) = setup_index(&[("a.md", "- [x] one ✅ 2024-01-05")]);
        index.refresh().await;
        assert!(index.get("a.md:0").unwrap().dates.contains_key(&DateKind::Completed));

        let record = index.update_status("a.md:0", TaskStatus::Todo).await.unwrap();
        assert!(!record.dates.contains_key(&DateKind::Completed));
        assert_eq!(record.raw_line, "- [ ] one ✅ 2024-01-05");
    }

    #[tokio::test]
    async fn crlf_line_endings_survive() {
        let (store, index) = setup_index(&[("a.md", "- [ ] one\r\n- [ ] two\r\n")]);
        index.refresh().await;

        index.update_status("a.md:1", TaskStatus::InProgress).await.unwrap();

        assert_eq!(store.contents("a.md").unwrap(), "- [ ] one\r\n- [/] two\r\n");
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let (_store, index) = setup_index(&[]);
        let err = index.update_status("nope.md:0", TaskStatus::Done).await.unwrap_err();
        assert!(matches!(err, IndexError::TaskNotFound(_)));
    }
}

mod persistence_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_writes_snapshot_once() {
        let (store, index) = setup_index(&[("a.md", "- [ ] v0")]);
        index.refresh().await;
        assert_eq!(store.write_count(SNAPSHOT), 1);

        for n in 1..=5 {
            store.insert("a.md", format!("- [ ] v{n}"));
            index.on_document_changed("a.md").await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        // last change was 200ms ago; the window is 1000ms
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(store.write_count(SNAPSHOT), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.write_count(SNAPSHOT), 2);

        let snapshot = IndexSnapshot::from_json(&store.contents(SNAPSHOT).unwrap()).unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].description, "v5");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_write() {
        let (store, index) = setup_index(&[("a.md", "- [ ] one")]);
        index.refresh().await;

        index.on_document_deleted("a.md");
        assert!(index.shutdown().await);
        assert_eq!(store.write_count(SNAPSHOT), 2);
        assert!(!index.shutdown().await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.write_count(SNAPSHOT), 2);

        let snapshot = IndexSnapshot::from_json(&store.contents(SNAPSHOT).unwrap()).unwrap();
        assert!(snapshot.tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_write_in_flight() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::with_documents([("a.md", "- [ ] one")]),
            delay: Duration::ZERO,
            write_delay: Duration::from_millis(500),
        });
        let index = TaskIndex::new(
            store.clone(),
            RoleTable::default(),
            AssigneeConfig::default(),
            IndexOptions {
                snapshot_path: SNAPSHOT.to_string(),
                debounce: Duration::from_millis(100),
            },
        );
        index.on_document_changed("a.md").await;

        // the debounced write has started and is still writing
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.inner.write_count(SNAPSHOT), 0);

        assert!(!index.shutdown().await);
        assert_eq!(store.inner.write_count(SNAPSHOT), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_debounce_window() {
        let store = Arc::new(MemoryStore::with_documents([("a.md", "- [ ] one")]));
        let index = TaskIndex::new(
            store.clone(),
            RoleTable::default(),
            AssigneeConfig::default(),
            IndexOptions {
                snapshot_path: "cache/index.json".to_string(),
                debounce: Duration::from_millis(100),
            },
        );
        index.on_document_changed("a.md").await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.write_count("cache/index.json"), 1);
        assert!(store.has_folder("cache"));
    }
}
