// SPDX-License-Identifier: MIT
//! Task persistence behind the [`TaskStore`] trait.
//!
//! Two implementations: [`PgTaskStore`] for the real PostgreSQL table and
//! [`MemoryTaskStore`] for tests. The service only ever sees
//! `Arc<dyn TaskStore>`, so swapping one for the other is a construction
//! detail at startup.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTaskStore;
pub use postgres::PgTaskStore;

use async_trait::async_trait;

use crate::tasks::model::{NewTask, Task, TaskChanges};

/// Store-level failures, kept separate from the domain error so a unique
/// violation can be told apart from everything else.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unique constraint on `tasks.name` rejected an insert or rename.
    #[error("task name already taken")]
    Duplicate,
    /// A stored row held a value the model does not recognize.
    #[error("invalid stored row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The persistence surface the task service needs. Every method maps to a
/// single atomic statement in the PostgreSQL implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new record, assigning its id. Fails with
    /// [`StoreError::Duplicate`] when the name is taken.
    async fn insert(&self, new: NewTask) -> Result<Task, StoreError>;

    async fn fetch_by_name(&self, name: &str) -> Result<Option<Task>, StoreError>;

    /// All tasks, ordered by name.
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Apply `changes` to the record named `name` and return the updated row,
    /// or `None` when no such record exists.
    async fn update_by_name(
        &self,
        name: &str,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError>;

    /// Remove the record named `name` and return the deleted row, or `None`
    /// when no such record exists.
    async fn delete_by_name(&self, name: &str) -> Result<Option<Task>, StoreError>;
}
