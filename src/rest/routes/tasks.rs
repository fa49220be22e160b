//! Task resource handlers.
//!
//! Handlers stay thin: body validation happens in the [`JsonBody`] extractor
//! and the rules live in [`crate::tasks::TaskService`]. The only logic here
//! is picking status codes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::rest::error::ApiError;
use crate::rest::extract::JsonBody;
use crate::tasks::model::{validate_name, Task, TaskPatch, TaskPayload};
use crate::AppContext;

pub async fn list_tasks(State(ctx): State<Arc<AppContext>>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(ctx.tasks.list().await?))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(name): Path<String>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(ctx.tasks.get(&name).await?))
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = ctx.tasks.create(payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(name): Path<String>,
    patch: Option<JsonBody<TaskPatch>>,
) -> Result<Json<Task>, ApiError> {
    let task = ctx.tasks.patch(&name, patch.map(|JsonBody(p)| p)).await?;
    Ok(Json(task))
}

pub async fn upsert_task(
    State(ctx): State<Arc<AppContext>>,
    Path(name): Path<String>,
    payload: Option<JsonBody<TaskPayload>>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    // The path name becomes the record name on create, so it gets the same
    // length checks a body name would.
    validate_name(&name)?;
    let (task, created) = ctx.tasks.upsert(&name, payload.map(|JsonBody(p)| p)).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(task)))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.tasks.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
