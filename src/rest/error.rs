//! Maps domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::tasks::TaskError;

/// An error response: a status code plus an `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        let status = match &err {
            TaskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            TaskError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Expected client-side outcomes stay quiet; store failures are ours
        // and get logged.
        if self.status.is_server_error() {
            error!(status = %self.status, err = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    #[test]
    fn test_taxonomy_maps_to_status_codes() {
        let cases = [
            (
                TaskError::Validation("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TaskError::NotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                TaskError::AlreadyExists("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TaskError::Store(StoreError::Corrupt("bad row".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_not_found_message_names_the_task() {
        let api = ApiError::from(TaskError::NotFound("deploy".to_string()));
        assert_eq!(api.message, "task 'deploy' not found");
    }
}
