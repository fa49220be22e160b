//! The task resource: model types, validation, and the CRUD service.

pub mod model;
pub mod service;

pub use model::{Task, TaskPatch, TaskPayload, TaskStatus};
pub use service::TaskService;

use crate::storage::StoreError;

/// Everything that can go wrong while handling a task operation.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The input failed validation; nothing was read or written.
    #[error("{0}")]
    Validation(String),
    #[error("task '{0}' not found")]
    NotFound(String),
    #[error("task '{0}' already exists")]
    AlreadyExists(String),
    /// The store failed; surfaced to the caller as an internal error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
