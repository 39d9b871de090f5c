use std::fs;
use std::sync::Arc;
use std::thread;
use todo_core::{SnapshotTodoStore, StoreError, Todo, TodoStore};

#[test]
fn missing_file_opens_empty_and_is_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");

    let store = SnapshotTodoStore::open(&path).unwrap();

    assert_eq!(store.path(), path.as_path());
    assert!(store.is_empty().unwrap());
    assert!(store.get_all().unwrap().is_empty());
    assert!(!path.exists());
}

#[test]
fn every_mutation_rewrites_the_full_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let store = SnapshotTodoStore::open(&path).unwrap();

    store.create("first").unwrap();
    store.create("second").unwrap();
    store.update(1, "", "completed").unwrap();
    store.delete(2).unwrap();

    let on_disk: Vec<Todo> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, store.get_all().unwrap());
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].completed, "completed");
    assert!(!dir.path().join("todos.json.tmp").exists());
}

#[test]
fn reopening_restores_todos_and_continues_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");

    let created: Vec<Todo> = {
        let store = SnapshotTodoStore::open(&path).unwrap();
        (0..5)
            .map(|n| store.create(&format!("task {n}")).unwrap())
            .collect()
    };

    let reopened = SnapshotTodoStore::open(&path).unwrap();
    assert_eq!(reopened.get_all().unwrap(), created);
    assert!(!dir.path().join("todos.json.tmp").exists());

    let max_id = created.iter().map(|todo| todo.id).max().unwrap();
    let next = reopened.create("after restart").unwrap();
    assert!(next.id > max_id);
}

#[test]
fn counter_is_seeded_from_largest_id_not_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    fs::write(
        &path,
        r#"[
            {"id": 3, "title": "three", "completed": "not completed"},
            {"id": 42, "title": "forty-two", "completed": "completed"}
        ]"#,
    )
    .unwrap();

    let store = SnapshotTodoStore::open(&path).unwrap();
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(store.create("next").unwrap().id, 43);
}

#[test]
fn malformed_snapshot_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SnapshotTodoStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Snapshot { .. }));
}

#[test]
fn duplicate_ids_fail_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    fs::write(
        &path,
        r#"[
            {"id": 1, "title": "a", "completed": "not completed"},
            {"id": 1, "title": "b", "completed": "not completed"}
        ]"#,
    )
    .unwrap();

    let err = SnapshotTodoStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn failed_create_rolls_back_memory_and_counter() {
    let dir = tempfile::tempdir().unwrap();
    let missing_parent = dir.path().join("not-yet");
    let store = SnapshotTodoStore::open(missing_parent.join("todos.json")).unwrap();

    let err = store.create("lost").unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(store.get_all().unwrap().is_empty());

    fs::create_dir(&missing_parent).unwrap();
    let todo = store.create("kept").unwrap();
    assert_eq!(todo.id, 1);
    assert_eq!(store.get_all().unwrap(), vec![todo]);
}

#[test]
fn failed_update_and_delete_leave_state_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let store = SnapshotTodoStore::open(&path).unwrap();
    let original = store.create("original").unwrap();
    let on_disk_before = fs::read(&path).unwrap();

    // A directory where the temp file should go makes every write fail.
    let blocker = dir.path().join("todos.json.tmp");
    fs::create_dir(&blocker).unwrap();

    let update_err = store.update(original.id, "changed", "completed").unwrap_err();
    assert!(matches!(update_err, StoreError::Io { .. }));
    assert_eq!(store.get_by_id(original.id).unwrap(), Some(original.clone()));

    let delete_err = store.delete(original.id).unwrap_err();
    assert!(matches!(delete_err, StoreError::Io { .. }));
    assert_eq!(store.get_by_id(original.id).unwrap(), Some(original.clone()));

    assert_eq!(fs::read(&path).unwrap(), on_disk_before);

    fs::remove_dir(&blocker).unwrap();
    assert!(store.delete(original.id).unwrap());
}

#[test]
fn concurrent_creates_get_distinct_ids_and_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let store = Arc::new(SnapshotTodoStore::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..10)
                    .map(|n| store.create(&format!("w{worker}-{n}")).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 80);

    let reopened = SnapshotTodoStore::open(&path).unwrap();
    assert_eq!(reopened.len().unwrap(), 80);
}

#[test]
fn readers_run_alongside_writers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SnapshotTodoStore::open(dir.path().join("todos.json")).unwrap());
    store.create("seed").unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for n in 0..20 {
                store.create(&format!("item {n}")).unwrap();
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                let all = store.get_all().unwrap();
                assert!(!all.is_empty());
                assert!(all.windows(2).all(|pair| pair[0].id < pair[1].id));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.len().unwrap(), 21);
}
