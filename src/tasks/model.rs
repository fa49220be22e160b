// SPDX-License-Identifier: MIT
//! Task data model and input validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TaskError;

/// Longest accepted task name, counted in characters.
pub const MAX_NAME_CHARS: usize = 256;

/// Lifecycle state of a task.
///
/// Stored under its canonical name (`CREATED`, `IN_PROGRESS`, `COMPLETED`)
/// and exposed over the API as a display label (`Created`, `In progress`,
/// `Completed`). Both directions of both mappings live here and nowhere else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskStatus {
    #[default]
    Created,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Canonical string stored in the `tasks.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    /// Label used in request and response bodies.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Created => "Created",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Parse the stored column value.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(TaskStatus::Created),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "COMPLETED" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Parse a display label from an API payload.
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(TaskStatus::Created),
            "In progress" => Some(TaskStatus::InProgress),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TaskStatus::from_label(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown status '{s}', expected one of: Created, In progress, Completed"
            ))
        })
    }
}

/// A stored task record, as returned by every read and write operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

/// Checks applied to a deserialized body before it reaches the service.
pub trait Validate {
    fn validate(&self) -> Result<(), TaskError>;
}

/// Name must be 1 to 256 characters (characters, not bytes).
pub fn validate_name(name: &str) -> Result<(), TaskError> {
    let chars = name.chars().count();
    if chars == 0 {
        return Err(TaskError::Validation("name must not be empty".to_string()));
    }
    if chars > MAX_NAME_CHARS {
        return Err(TaskError::Validation(format!(
            "name is {chars} characters long, the maximum is {MAX_NAME_CHARS}"
        )));
    }
    Ok(())
}

/// Full task payload for create and replace requests.
///
/// The shape matches [`Task`] minus the server-assigned id: clients may send
/// `"id": null` but never a concrete value. Unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Validate for TaskPayload {
    fn validate(&self) -> Result<(), TaskError> {
        if self.id.is_some() {
            return Err(TaskError::Validation(
                "id is assigned by the server and must not be supplied".to_string(),
            ));
        }
        validate_name(&self.name)
    }
}

/// Partial update payload. Absent and `null` fields both mean "leave as is";
/// there is no way to clear a description through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// True when no field is set; the service then returns the record untouched.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<(), TaskError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }
}

/// Insert parameters handed to the store. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl NewTask {
    /// The record created by an upsert that arrives without a body.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            status: TaskStatus::default(),
        }
    }
}

impl From<TaskPayload> for NewTask {
    fn from(p: TaskPayload) -> Self {
        Self {
            name: p.name,
            description: p.description,
            status: p.status,
        }
    }
}

/// Column updates applied by `update_by_name`. `None` keeps the stored value;
/// `description` carries a second `Option` level so a replace can write NULL.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl From<TaskPatch> for TaskChanges {
    fn from(p: TaskPatch) -> Self {
        Self {
            name: p.name,
            description: p.description.map(Some),
            status: p.status,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
