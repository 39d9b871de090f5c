//! Domain model for todo items.
//!
//! # Responsibility
//! - Define the canonical record owned by the store layer.
//! - Keep title/identifier validity rules next to the record they guard.
//!
//! # Invariants
//! - Every stored todo is identified by a positive `TodoId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod todo;
