//! Todo domain model.
//!
//! # Responsibility
//! - Define the record shared by both store backends and the HTTP layer.
//! - Provide the partial-update merge rule used by every backend.
//!
//! # Invariants
//! - `id` is positive and never changes after assignment.
//! - `title` is non-empty after trimming once it passes the service layer.
//! - `completed` is free-form; only the default value is fixed.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier. Always positive.
pub type TodoId = i64;

/// Status assigned to every newly created todo.
pub const STATUS_NOT_COMPLETED: &str = "not completed";
/// Conventional status for finished todos.
pub const STATUS_COMPLETED: &str = "completed";

/// Validation errors for caller-supplied todo data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title is empty or whitespace only.
    EmptyTitle,
    /// Identifier is zero or negative.
    NonPositiveId(TodoId),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::NonPositiveId(id) => write!(f, "todo id must be positive, got {id}"),
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical todo record.
///
/// Callers always receive owned clones; changing a returned value never
/// affects the stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: String,
}

impl Todo {
    /// Creates a todo with the default `"not completed"` status.
    pub fn new(id: TodoId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: STATUS_NOT_COMPLETED.to_string(),
        }
    }

    /// Returns whether the status equals the conventional completed value.
    pub fn is_completed(&self) -> bool {
        self.completed == STATUS_COMPLETED
    }

    /// Returns a copy with non-empty arguments applied.
    ///
    /// An empty `title` or `completed` keeps the current value; anything
    /// else replaces it verbatim.
    pub fn merged(&self, title: &str, completed: &str) -> Self {
        Self {
            id: self.id,
            title: if title.is_empty() {
                self.title.clone()
            } else {
                title.to_string()
            },
            completed: if completed.is_empty() {
                self.completed.clone()
            } else {
                completed.to_string()
            },
        }
    }
}

/// Trims `title` and rejects it when nothing is left.
pub fn normalize_title(title: &str) -> Result<&str, TodoValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    Ok(trimmed)
}

/// Rejects zero and negative identifiers.
pub fn validate_id(id: TodoId) -> Result<TodoId, TodoValidationError> {
    if id <= 0 {
        return Err(TodoValidationError::NonPositiveId(id));
    }
    Ok(id)
}
