//! Todo store contract and its two persistence backends.
//!
//! # Responsibility
//! - Define the one CRUD contract every backend satisfies.
//! - Keep persistence details (snapshot file, SQL) behind that contract.
//!
//! # Invariants
//! - Not-found is a distinguished outcome (`None` / `false`), never an error.
//! - A mutation that returns `Ok` has been durably persisted.
//! - A mutation that returns `Err` leaves the observable state unchanged.

use crate::db::DbError;
use crate::model::todo::{Todo, TodoId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub mod snapshot_store;
pub mod sqlite_store;

pub use snapshot_store::SnapshotTodoStore;
pub use sqlite_store::SqliteTodoStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failures raised by store backends.
#[derive(Debug)]
pub enum StoreError {
    /// Snapshot file could not be read, written or replaced.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Snapshot content could not be encoded or decoded.
    Snapshot {
        path: PathBuf,
        source: serde_json::Error,
    },
    Db(DbError),
    /// Persisted data violates a model invariant.
    InvalidData(String),
    /// A thread panicked while holding the store lock.
    LockPoisoned,
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "snapshot io error at `{}`: {source}", path.display())
            }
            Self::Snapshot { path, source } => {
                write!(f, "invalid snapshot `{}`: {source}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::LockPoisoned => write!(f, "store lock poisoned by a panicked writer"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Snapshot { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidData(_)
            | Self::LockPoisoned
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// CRUD contract shared by every todo backend.
///
/// Implementations are safe to call from many threads at once; every call is
/// synchronous and completes before returning.
pub trait TodoStore: Send + Sync {
    /// Stores a new todo with the default status and returns it with its id.
    fn create(&self, title: &str) -> StoreResult<Todo>;
    /// Returns a fresh copy of every stored todo.
    fn get_all(&self) -> StoreResult<Vec<Todo>>;
    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>>;
    /// Applies non-empty arguments to an existing todo.
    ///
    /// Empty `title` or `completed` keeps the stored value.
    fn update(&self, id: TodoId, title: &str, completed: &str) -> StoreResult<Option<Todo>>;
    /// Removes a todo; returns whether one existed.
    fn delete(&self, id: TodoId) -> StoreResult<bool>;
}

impl<S: TodoStore + ?Sized> TodoStore for Arc<S> {
    fn create(&self, title: &str) -> StoreResult<Todo> {
        (**self).create(title)
    }

    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        (**self).get_all()
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        (**self).get_by_id(id)
    }

    fn update(&self, id: TodoId, title: &str, completed: &str) -> StoreResult<Option<Todo>> {
        (**self).update(id, title, completed)
    }

    fn delete(&self, id: TodoId) -> StoreResult<bool> {
        (**self).delete(id)
    }
}

impl<S: TodoStore + ?Sized> TodoStore for Box<S> {
    fn create(&self, title: &str) -> StoreResult<Todo> {
        (**self).create(title)
    }

    fn get_all(&self) -> StoreResult<Vec<Todo>> {
        (**self).get_all()
    }

    fn get_by_id(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        (**self).get_by_id(id)
    }

    fn update(&self, id: TodoId, title: &str, completed: &str) -> StoreResult<Option<Todo>> {
        (**self).update(id, title, completed)
    }

    fn delete(&self, id: TodoId) -> StoreResult<bool> {
        (**self).delete(id)
    }
}
