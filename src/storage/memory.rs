// SPDX-License-Identifier: MIT
//! In-memory task store.
//!
//! Mirrors the PostgreSQL semantics, including the unique-name guarantee and
//! the returning behavior of updates and deletes, so service and API tests
//! run without a database.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::tasks::model::{NewTask, Task, TaskChanges};

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, new: NewTask) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.iter().any(|t| t.name == new.name) {
            return Err(StoreError::Duplicate);
        }
        let task = Task {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            status: new.status,
        };
        tasks.push(task.clone());
        Ok(task)
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|t| t.name == name).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut all = self.tasks.read().await.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update_by_name(
        &self,
        name: &str,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        if let Some(new_name) = &changes.name {
            if new_name != name && tasks.iter().any(|t| t.name == *new_name) {
                return Err(StoreError::Duplicate);
            }
        }
        let task = match tasks.iter_mut().find(|t| t.name == name) {
            Some(t) => t,
            None => return Ok(None),
        };
        if let Some(new_name) = changes.name {
            task.name = new_name;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        Ok(Some(task.clone()))
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter().position(|t| t.name == name) {
            Some(pos) => Ok(Some(tasks.remove(pos))),
            None => Ok(None),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
