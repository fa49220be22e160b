// SPDX-License-Identifier: MIT
//! Task CRUD and upsert logic on top of an injected store.
//!
//! Every operation is a lookup followed by at most one conditional write.
//! There are no retries: the unique constraint on the name column is the
//! only guard against concurrent creates, and losing that race surfaces as
//! an already-exists error.

use std::sync::Arc;

use super::model::{NewTask, Task, TaskChanges, TaskPatch, TaskPayload};
use super::TaskError;
use crate::storage::{StoreError, TaskStore};

/// Cheap to clone; the store is shared behind an `Arc`.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.fetch_all().await?)
    }

    pub async fn get(&self, name: &str) -> Result<Task, TaskError> {
        self.store
            .fetch_by_name(name)
            .await?
            .ok_or_else(|| TaskError::NotFound(name.to_string()))
    }

    /// Insert a new task. The prior lookup gives the common case a clean
    /// error; the constraint catches the create race.
    pub async fn create(&self, payload: TaskPayload) -> Result<Task, TaskError> {
        if self.store.fetch_by_name(&payload.name).await?.is_some() {
            return Err(TaskError::AlreadyExists(payload.name));
        }
        let name = payload.name.clone();
        match self.store.insert(payload.into()).await {
            Ok(task) => Ok(task),
            Err(StoreError::Duplicate) => Err(TaskError::AlreadyExists(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the set fields of `patch` to the task named `name`. An absent
    /// or empty patch returns the record as it stands.
    pub async fn patch(&self, name: &str, patch: Option<TaskPatch>) -> Result<Task, TaskError> {
        let existing = self.get(name).await?;
        let patch = patch.unwrap_or_default();
        if patch.is_empty() {
            return Ok(existing);
        }
        self.apply_changes(name, patch.into()).await
    }

    /// Create-or-replace keyed by the path name. The returned flag is true
    /// when a new record was created.
    ///
    /// The path name is authoritative: a body carrying a different name is
    /// rejected before anything is read or written.
    pub async fn upsert(
        &self,
        name: &str,
        payload: Option<TaskPayload>,
    ) -> Result<(Task, bool), TaskError> {
        if let Some(p) = &payload {
            if p.name != name {
                return Err(TaskError::Validation(format!(
                    "body name '{}' does not match path name '{}'",
                    p.name, name
                )));
            }
        }

        match self.store.fetch_by_name(name).await? {
            None => {
                let new = match payload {
                    Some(p) => NewTask::from(p),
                    None => NewTask::named(name),
                };
                match self.store.insert(new).await {
                    Ok(task) => Ok((task, true)),
                    Err(StoreError::Duplicate) => Err(TaskError::AlreadyExists(name.to_string())),
                    Err(e) => Err(e.into()),
                }
            }
            Some(existing) => match payload {
                None => Ok((existing, false)),
                Some(p) => {
                    // Full replace of the mutable fields: the body's values
                    // win even when they are the defaults.
                    let changes = TaskChanges {
                        name: None,
                        description: Some(p.description),
                        status: Some(p.status),
                    };
                    let task = self.apply_changes(name, changes).await?;
                    Ok((task, false))
                }
            },
        }
    }

    pub async fn delete(&self, name: &str) -> Result<(), TaskError> {
        match self.store.delete_by_name(name).await? {
            Some(_) => Ok(()),
            None => Err(TaskError::NotFound(name.to_string())),
        }
    }

    /// Run an update statement and map its outcomes onto the error taxonomy.
    async fn apply_changes(&self, name: &str, changes: TaskChanges) -> Result<Task, TaskError> {
        let rename_to = changes.name.clone();
        match self.store.update_by_name(name, changes).await {
            Ok(Some(task)) => Ok(task),
            Ok(None) => Err(TaskError::NotFound(name.to_string())),
            Err(StoreError::Duplicate) => Err(TaskError::AlreadyExists(
                rename_to.unwrap_or_else(|| name.to_string()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTaskStore;
    use crate::tasks::model::TaskStatus;

    fn service() -> TaskService {
        TaskService::new(Arc::new(MemoryTaskStore::new()))
    }

    fn payload(name: &str) -> TaskPayload {
        TaskPayload {
            id: None,
            name: name.to_string(),
            description: None,
            status: TaskStatus::default(),
        }
    }

    fn patch_json(json: &str) -> TaskPatch {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let svc = service();
        let created = svc.create(payload("build")).await.unwrap();
        assert_eq!(created.status, TaskStatus::Created);
        assert!(created.description.is_none());

        let fetched = svc.get("build").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected_without_mutation() {
        let svc = service();
        svc.create(payload("build")).await.unwrap();

        let mut second = payload("build");
        second.description = Some("other".to_string());
        let err = svc.create(second).await.unwrap_err();
        assert!(matches!(err, TaskError::AlreadyExists(name) if name == "build"));

        let all = svc.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].description.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let svc = service();
        let err = svc.get("ghost").await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_patch_missing_is_not_found() {
        let svc = service();
        let err = svc.patch("ghost", None).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_patch_returns_record_unchanged() {
        let svc = service();
        let created = svc.create(payload("build")).await.unwrap();

        let after_none = svc.patch("build", None).await.unwrap();
        assert_eq!(after_none, created);

        let after_empty = svc.patch("build", Some(patch_json("{}"))).await.unwrap();
        assert_eq!(after_empty, created);

        // Explicit nulls count as unset, not as clears.
        let after_nulls = svc
            .patch("build", Some(patch_json(r#"{"description": null}"#)))
            .await
            .unwrap();
        assert_eq!(after_nulls, created);
    }

    #[tokio::test]
    async fn test_patch_updates_only_set_fields() {
        let svc = service();
        svc.create(payload("build")).await.unwrap();

        let after = svc
            .patch("build", Some(patch_json(r#"{"description": "compile it"}"#)))
            .await
            .unwrap();
        assert_eq!(after.description.as_deref(), Some("compile it"));
        assert_eq!(after.status, TaskStatus::Created);

        let after = svc
            .patch("build", Some(patch_json(r#"{"status": "In progress"}"#)))
            .await
            .unwrap();
        assert_eq!(after.status, TaskStatus::InProgress);
        assert_eq!(after.description.as_deref(), Some("compile it"));
    }

    #[tokio::test]
    async fn test_patch_renames_task() {
        let svc = service();
        let created = svc.create(payload("old")).await.unwrap();

        let renamed = svc
            .patch("old", Some(patch_json(r#"{"name": "new"}"#)))
            .await
            .unwrap();
        assert_eq!(renamed.name, "new");
        assert_eq!(renamed.id, created.id);

        assert!(matches!(svc.get("old").await, Err(TaskError::NotFound(_))));
        assert!(svc.get("new").await.is_ok());
    }

    #[tokio::test]
    async fn test_patch_rename_collision_names_the_target() {
        let svc = service();
        svc.create(payload("a")).await.unwrap();
        svc.create(payload("b")).await.unwrap();

        let err = svc
            .patch("a", Some(patch_json(r#"{"name": "b"}"#)))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::AlreadyExists(name) if name == "b"));
    }

    #[tokio::test]
    async fn test_upsert_without_body_creates_default_record() {
        let svc = service();
        let (task, created) = svc.upsert("fresh", None).await.unwrap();
        assert!(created);
        assert_eq!(task.name, "fresh");
        assert!(task.description.is_none());
        assert_eq!(task.status, TaskStatus::Created);
    }

    #[tokio::test]
    async fn test_upsert_existing_without_body_is_a_read() {
        let svc = service();
        let mut p = payload("keep");
        p.description = Some("untouched".to_string());
        let original = svc.create(p).await.unwrap();

        let (task, created) = svc.upsert("keep", None).await.unwrap();
        assert!(!created);
        assert_eq!(task, original);
    }

    #[tokio::test]
    async fn test_upsert_with_body_replaces_mutable_fields() {
        let svc = service();
        let mut p = payload("item");
        p.description = Some("v1".to_string());
        p.status = TaskStatus::InProgress;
        let original = svc.create(p).await.unwrap();

        // Omitted description and status fall back to the payload defaults,
        // which replace the stored values.
        let (task, created) = svc.upsert("item", Some(payload("item"))).await.unwrap();
        assert!(!created);
        assert_eq!(task.id, original.id);
        assert!(task.description.is_none());
        assert_eq!(task.status, TaskStatus::Created);
    }

    #[tokio::test]
    async fn test_upsert_body_name_must_match_path() {
        let svc = service();
        let err = svc.upsert("path", Some(payload("body"))).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(matches!(svc.get("path").await, Err(TaskError::NotFound(_))));
        assert!(matches!(svc.get("body").await, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_missing() {
        let svc = service();
        svc.create(payload("gone")).await.unwrap();

        svc.delete("gone").await.unwrap();
        assert!(matches!(svc.get("gone").await, Err(TaskError::NotFound(_))));
        assert!(matches!(
            svc.delete("gone").await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let svc = service();
        svc.create(payload("citrus")).await.unwrap();
        svc.create(payload("apple")).await.unwrap();
        svc.create(payload("banana")).await.unwrap();

        let names: Vec<String> = svc
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["apple", "banana", "citrus"]);
    }
}
