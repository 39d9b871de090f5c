//! Core use-case services.
//!
//! # Responsibility
//! - Validate caller input before it reaches a store.
//! - Keep HTTP and other front ends decoupled from storage details.

pub mod todo_service;
