//! Strict JSON body extraction.
//!
//! The stock `Json` extractor turns malformed bodies into 400s and requires
//! the right content type. This API promises 422 for anything wrong with a
//! payload, runs field validation before the handler sees the value, and
//! treats an absent body (or a literal JSON `null`) as "no payload" on the
//! routes that allow one. Reading the raw bytes first keeps all of that in
//! one place.

use axum::body::Bytes;
use axum::extract::{FromRequest, OptionalFromRequest, Request};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::tasks::model::Validate;

pub struct JsonBody<T>(pub T);

async fn read_bytes<S>(req: Request, state: &S) -> Result<Bytes, ApiError>
where
    S: Send + Sync,
{
    <Bytes as FromRequest<S>>::from_request(req, state)
        .await
        .map_err(|e| ApiError::validation(format!("unreadable request body: {e}")))
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_bytes(req, state).await?;
        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::validation(format!("invalid request body: {e}")))?;
        value.validate()?;
        Ok(JsonBody(value))
    }
}

impl<S, T> OptionalFromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let bytes = read_bytes(req, state).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value: Option<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::validation(format!("invalid request body: {e}")))?;
        match value {
            None => Ok(None),
            Some(v) => {
                v.validate()?;
                Ok(Some(JsonBody(v)))
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::{TaskPatch, TaskPayload};
    use axum::body::Body;

    fn request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/tasks/")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn required(body: &str) -> Result<JsonBody<TaskPayload>, ApiError> {
        <JsonBody<TaskPayload> as FromRequest<()>>::from_request(request(body), &()).await
    }

    async fn optional(body: &str) -> Result<Option<JsonBody<TaskPatch>>, ApiError> {
        <JsonBody<TaskPatch> as OptionalFromRequest<()>>::from_request(request(body), &()).await
    }

    #[tokio::test]
    async fn test_required_body_parses_and_validates() {
        let JsonBody(payload) = required(r#"{"name": "build"}"#).await.unwrap();
        assert_eq!(payload.name, "build");

        assert!(required("").await.is_err());
        assert!(required("not json").await.is_err());
        assert!(required(r#"{"name": ""}"#).await.is_err());
    }

    #[tokio::test]
    async fn test_optional_body_absent_and_null_mean_none() {
        assert!(optional("").await.unwrap().is_none());
        assert!(optional("null").await.unwrap().is_none());

        let patch = optional(r#"{"status": "Completed"}"#).await.unwrap();
        assert!(patch.unwrap().0.status.is_some());
    }

    #[tokio::test]
    async fn test_optional_body_still_rejects_garbage() {
        assert!(optional("{").await.is_err());
        assert!(optional(r#"{"name": ""}"#).await.is_err());
        assert!(optional(r#"{"unknown": 1}"#).await.is_err());
    }
}
