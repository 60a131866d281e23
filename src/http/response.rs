//! Response rendering.
//!
//! # Responsibilities
//! - Write a handler's return value as the response body
//! - Render every failure, panics included, as the `{name, message}` envelope
//!
//! # Design Decisions
//! - `null` is 204, strings are `text/plain`, everything else is JSON with 200

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};
use serde_json::Value;
use std::any::Any;

use crate::error::{CoreError, CoreResult};

/// Render the outcome of a route pipeline.
pub fn respond(result: CoreResult<Value>) -> Response {
    match result {
        Ok(value) => reply(value),
        Err(e) => e.into_response(),
    }
}

pub fn reply(value: Value) -> Response {
    match value {
        Value::Null => StatusCode::NO_CONTENT.into_response(),
        Value::String(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
        other => (StatusCode::OK, Json(other)).into_response(),
    }
}

/// Envelope for a request whose path matched no route.
pub async fn not_found(uri: Uri) -> Response {
    CoreError::custom("NotFoundError", format!("No route for {}", uri.path()))
        .with_status(StatusCode::NOT_FOUND)
        .into_response()
}

/// Envelope for a path that exists but not under the request's method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    CoreError::custom(
        "MethodNotAllowedError",
        format!("{method} is not allowed on {}", uri.path()),
    )
    .with_status(StatusCode::METHOD_NOT_ALLOWED)
    .into_response()
}

/// Replace the bare 408 of the timeout layer with the envelope.
///
/// Responses that already carry a body type are left alone.
pub async fn envelope_timeout<B>(response: Response<B>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        tracing::warn!("Request timed out");
        return CoreError::custom("RequestTimeoutError", "Request took too long to complete")
            .with_status(StatusCode::REQUEST_TIMEOUT)
            .into_response();
    }
    response.map(Body::new)
}

/// Envelope for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    CoreError::Internal("handler panicked".into()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorEnvelope;
    use serde_json::json;

    async fn body_of(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_json_value() {
        let response = reply(json!({"ok": true}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_of(response).await, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_string_is_plain_text() {
        let response = reply(json!("pong"));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_of(response).await, b"pong");
    }

    #[tokio::test]
    async fn test_null_is_no_content() {
        let response = reply(Value::Null);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = respond(Err(CoreError::AuthTimeout));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let envelope: ErrorEnvelope = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(envelope.name, "AuthTimeoutError");
        assert_eq!(envelope.message, "Authentication expired, please log in again");
    }

    #[tokio::test]
    async fn test_bare_timeout_gets_envelope() {
        let response = envelope_timeout(StatusCode::REQUEST_TIMEOUT.into_response()).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let envelope: ErrorEnvelope = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(envelope.name, "RequestTimeoutError");

        let passthrough = envelope_timeout(reply(json!("ok"))).await;
        assert_eq!(passthrough.status(), StatusCode::OK);
        assert_eq!(body_of(passthrough).await, b"ok");
    }

    #[tokio::test]
    async fn test_panic_envelope() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: ErrorEnvelope = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(envelope.name, "InternalError");
    }
}
