//! Core domain logic for the todo service.
//! This crate owns every todo invariant; front ends only translate requests.

pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use logging::{default_log_level, flush_logging, init_logging, logging_status};
pub use model::todo::{
    normalize_title, validate_id, Todo, TodoId, TodoValidationError, STATUS_COMPLETED,
    STATUS_NOT_COMPLETED,
};
pub use service::todo_service::{ServiceError, ServiceResult, TodoPatch, TodoService};
pub use store::{SnapshotTodoStore, SqliteTodoStore, StoreError, StoreResult, TodoStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
