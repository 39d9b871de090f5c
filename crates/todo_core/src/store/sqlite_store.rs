//! SQLite-backed todo store.
//!
//! # Responsibility
//! - Map the store contract onto single SQL statements over `todos`.
//! - Delegate id assignment to `AUTOINCREMENT` and atomicity to SQLite.
//!
//! # Invariants
//! - Each operation is exactly one statement, so SQLite isolates it.
//! - Zero affected rows is not-found; every SQLite error is propagated.
//! - Read paths reject persisted rows that break model invariants.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::todo::{validate_id, Todo, TodoId, STATUS_NOT_COMPLETED};
use crate::store::{StoreError, StoreResult, TodoStore};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TODOS_TABLE: &str = "todos";

const TODO_SELECT_SQL: &str = "SELECT id, title, completed FROM todos";

/// Todo store over one SQLite connection.
///
/// `rusqlite::Connection` is `Send` but not `Sync`; the mutex only serializes
/// access to the handle. Consistency between concurrent callers comes from
/// SQLite executing each statement atomically.
#[derive(Debug)]
pub struct SqliteTodoStore {
    conn: Mutex<Connection>,
}

impl SqliteTodoStore {
    /// Opens (or creates) a database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database. Contents vanish on drop.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps an already-open connection.
    ///
    /// # Errors
    /// - `StoreError::UninitializedConnection` when migrations are not at the
    ///   latest version.
    /// - `StoreError::MissingRequiredTable` when `todos` is absent.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl TodoStore for SqliteTodoStore {
    fn create(&self, title: &str) -> StoreResult<Todo> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO todos (title, completed)
             VALUES (?1, ?2)
             RETURNING id, title, completed;",
        )?;
        let todo = stmt.query_row(params![title, STATUS_NOT_COMPLETED], todo_from_row)?;
        let todo = checked(todo)?;

        debug!(
            "event=todo_create module=store backend=sqlite status=ok id={}",
            todo.id
        );
        Ok(todo)
    }

    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!("{TODO_SELECT_SQL} ORDER BY id ASC;"))?;
        let rows = stmt.query_map([], todo_from_row)?;

        let mut todos = Vec::new();
        for row in rows {
            todos.push(checked(row?)?);
        }
        Ok(todos)
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
        let todo = stmt.query_row([id], todo_from_row).optional()?;
        todo.map(checked).transpose()
    }

    fn update(&self, id: TodoId, title: &str, completed: &str) -> StoreResult<Option<Todo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "UPDATE todos
             SET
                title = CASE WHEN ?1 = '' THEN title ELSE ?1 END,
                completed = CASE WHEN ?2 = '' THEN completed ELSE ?2 END
             WHERE id = ?3
             RETURNING id, title, completed;",
        )?;
        let updated = stmt
            .query_row(params![title, completed, id], todo_from_row)
            .optional()?
            .map(checked)
            .transpose()?;

        if updated.is_some() {
            debug!("event=todo_update module=store backend=sqlite status=ok id={id}");
        }
        Ok(updated)
    }

    fn delete(&self, id: TodoId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM todos WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Ok(false);
        }

        debug!("event=todo_delete module=store backend=sqlite status=ok id={id}");
        Ok(true)
    }
}

fn ensure_schema(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [TODOS_TABLE],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(StoreError::MissingRequiredTable(TODOS_TABLE));
    }

    Ok(())
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        completed: row.get("completed")?,
    })
}

fn checked(todo: Todo) -> StoreResult<Todo> {
    validate_id(todo.id)
        .map_err(|err| StoreError::InvalidData(format!("{err} in todos.id")))?;
    Ok(todo)
}
