//! Todo use-case service.
//!
//! # Responsibility
//! - Provide validated CRUD entry points over any `TodoStore`.
//! - Translate optional update fields into the store's empty-means-keep rule.
//!
//! # Invariants
//! - Titles reach the store trimmed and non-empty.
//! - Ids reach the store positive.
//! - Service layer remains storage-agnostic.

use crate::model::todo::{normalize_title, validate_id, Todo, TodoId, TodoValidationError};
use crate::store::{StoreError, TodoStore};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for todo use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input was rejected before touching the store.
    Validation(TodoValidationError),
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TodoValidationError> for ServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Partial update request. `None` or `""` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<String>,
}

/// Use-case service wrapper for todo CRUD operations.
#[derive(Debug, Clone)]
pub struct TodoService<S: TodoStore> {
    store: S,
}

impl<S: TodoStore> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Direct access to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a todo after trimming and checking the title.
    pub fn create_todo(&self, title: &str) -> ServiceResult<Todo> {
        let title = normalize_title(title)?;
        Ok(self.store.create(title)?)
    }

    pub fn list_todos(&self) -> ServiceResult<Vec<Todo>> {
        Ok(self.store.get_all()?)
    }

    pub fn get_todo(&self, id: TodoId) -> ServiceResult<Option<Todo>> {
        let id = validate_id(id)?;
        Ok(self.store.get_by_id(id)?)
    }

    /// Applies a partial update.
    ///
    /// # Contract
    /// - Absent or empty title keeps the stored title; a whitespace-only
    ///   title is rejected.
    /// - Any non-empty `completed` replaces the status verbatim.
    /// - Returns `Ok(None)` when the id does not exist.
    pub fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> ServiceResult<Option<Todo>> {
        let id = validate_id(id)?;
        let title = match patch.title.as_deref() {
            None | Some("") => "",
            Some(title) => normalize_title(title)?,
        };
        let completed = patch.completed.as_deref().unwrap_or("");
        Ok(self.store.update(id, title, completed)?)
    }

    /// Deletes a todo; returns whether one existed.
    pub fn delete_todo(&self, id: TodoId) -> ServiceResult<bool> {
        let id = validate_id(id)?;
        Ok(self.store.delete(id)?)
    }
}
