//! Snapshot-file todo store.
//!
//! # Responsibility
//! - Keep the full todo collection in memory behind one reader/writer lock.
//! - Rewrite the whole collection to a JSON file on every mutation.
//!
//! # Invariants
//! - Writers hold the exclusive lock across the memory change and the file
//!   write, so no second writer can interleave.
//! - A failed file write rolls the memory change back before returning.
//! - Readers never touch the file.
//! - The file is replaced via write-to-temp + rename, never truncated in place.
//! - The parent directory is fsynced after the rename so the new entry is durable.

use crate::model::todo::{validate_id, Todo, TodoId};
use crate::store::{StoreError, StoreResult, TodoStore};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

const FIRST_ID: TodoId = 1;

/// Todo store persisted as a single JSON array file.
///
/// Every mutation serializes the entire collection, so write cost grows
/// linearly with the number of stored todos. This is fine for small personal
/// lists and is the scaling ceiling of this backend.
///
/// The id counter is reseeded from the largest id in the file on open, so
/// deleting the newest todo and restarting lets its id be issued again.
/// Use [`crate::store::SqliteTodoStore`] when ids must never repeat across
/// restarts.
#[derive(Debug)]
pub struct SnapshotTodoStore {
    path: PathBuf,
    state: RwLock<SnapshotState>,
}

#[derive(Debug)]
struct SnapshotState {
    todos: HashMap<TodoId, Todo>,
    next_id: TodoId,
}

impl SnapshotTodoStore {
    /// Opens the store backed by `path`.
    ///
    /// A missing file yields an empty store; the file is only created by the
    /// first mutation.
    ///
    /// # Errors
    /// - `StoreError::Io` when the file exists but cannot be read.
    /// - `StoreError::Snapshot` when the content is not a JSON todo array.
    /// - `StoreError::InvalidData` for non-positive or duplicate ids.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let started_at = Instant::now();

        let state = match load_snapshot(&path) {
            Ok(state) => state,
            Err(err) => {
                error!(
                    "event=store_open module=store backend=snapshot status=error path={} error={}",
                    path.display(),
                    err
                );
                return Err(err);
            }
        };

        info!(
            "event=store_open module=store backend=snapshot status=ok path={} todos={} next_id={} duration_ms={}",
            path.display(),
            state.todos.len(),
            state.next_id,
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Backing snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of todos currently held.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.todos.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, SnapshotState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, SnapshotState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn persist(&self, state: &SnapshotState, op: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        match write_snapshot(&self.path, &state.sorted()) {
            Ok(()) => {
                debug!(
                    "event=snapshot_write module=store status=ok op={} todos={} duration_ms={}",
                    op,
                    state.todos.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=snapshot_write module=store status=error op={} path={} error={}",
                    op,
                    self.path.display(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl TodoStore for SnapshotTodoStore {
    fn create(&self, title: &str) -> StoreResult<Todo> {
        let mut state = self.write()?;

        let id = state.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData("todo id space exhausted".to_string()))?;
        let todo = Todo::new(id, title);

        state.todos.insert(id, todo.clone());
        state.next_id = next_id;

        if let Err(err) = self.persist(&state, "create") {
            state.todos.remove(&id);
            state.next_id = id;
            return Err(err);
        }

        debug!("event=todo_create module=store backend=snapshot status=ok id={id}");
        Ok(todo)
    }

    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        let state = self.read()?;
        let todos = state.sorted().into_iter().cloned().collect();
        Ok(todos)
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Ok(self.read()?.todos.get(&id).cloned())
    }

    fn update(&self, id: TodoId, title: &str, completed: &str) -> StoreResult<Option<Todo>> {
        let mut state = self.write()?;

        let Some(current) = state.todos.get(&id).cloned() else {
            return Ok(None);
        };
        let updated = current.merged(title, completed);
        state.todos.insert(id, updated.clone());

        if let Err(err) = self.persist(&state, "update") {
            state.todos.insert(id, current);
            return Err(err);
        }

        debug!("event=todo_update module=store backend=snapshot status=ok id={id}");
        Ok(Some(updated))
    }

    fn delete(&self, id: TodoId) -> StoreResult<bool> {
        let mut state = self.write()?;

        let Some(removed) = state.todos.remove(&id) else {
            return Ok(false);
        };

        if let Err(err) = self.persist(&state, "delete") {
            state.todos.insert(id, removed);
            return Err(err);
        }

        debug!("event=todo_delete module=store backend=snapshot status=ok id={id}");
        Ok(true)
    }
}

impl SnapshotState {
    fn empty() -> Self {
        Self {
            todos: HashMap::new(),
            next_id: FIRST_ID,
        }
    }

    fn from_records(records: Vec<Todo>) -> StoreResult<Self> {
        let mut state = Self::empty();

        for todo in records {
            let id = validate_id(todo.id)
                .map_err(|err| StoreError::InvalidData(err.to_string()))?;
            if id >= state.next_id {
                state.next_id = id.checked_add(1).ok_or_else(|| {
                    StoreError::InvalidData(format!("todo id {id} leaves no room for new ids"))
                })?;
            }
            if state.todos.insert(id, todo).is_some() {
                return Err(StoreError::InvalidData(format!(
                    "duplicate todo id {id} in snapshot"
                )));
            }
        }

        Ok(state)
    }

    /// Todos ordered by id, for deterministic file content and listings.
    fn sorted(&self) -> Vec<&Todo> {
        let mut todos: Vec<&Todo> = self.todos.values().collect();
        todos.sort_by_key(|todo| todo.id);
        todos
    }
}

fn load_snapshot(path: &Path) -> StoreResult<SnapshotState> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SnapshotState::empty()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records: Vec<Todo> =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;

    SnapshotState::from_records(records)
}

fn write_snapshot(path: &Path, todos: &[&Todo]) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(todos).map_err(|source| StoreError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp_path = temp_path_for(path);
    if let Err(source) = write_synced(&tmp_path, &json) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: tmp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    // The rename already took effect; a failed directory sync must not roll it back.
    if let Err(err) = sync_parent_dir(path) {
        warn!(
            "event=snapshot_dir_sync module=store status=error path={} error={}",
            path.display(),
            err
        );
    }

    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg_attr(not(unix), allow(dead_code))]
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    File::open(parent_dir(path))?.sync_all()
}

// Directory handles cannot be fsynced through std on this platform.
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
