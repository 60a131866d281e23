//! Error taxonomy and the error envelope.
//!
//! Every failure raised inside a route pipeline is a [`CoreError`]. Each
//! variant carries a stable `name` and an HTTP status; the error boundary
//! renders both as `{ "name": ..., "message": ... }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::StoreError;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing parameter {0}")]
    MissingParam(String),

    #[error("Authentication expired, please log in again")]
    AuthTimeout,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Resource {0} was not found.")]
    ResourceNotFound(String),

    #[error("Object {0} already exists.")]
    ObjectAlreadyExist(String),

    #[error("Field {0} is incorrect")]
    FieldIncorrect(String),

    #[error("No permission to {0}")]
    NoPermission(String),

    #[error("{0} is already in use")]
    FieldUsed(String),

    #[error("User does not exist")]
    UserNotExist,

    #[error("Undefined error: {0}")]
    NotDefined(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid route table: {0}")]
    Registration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Application-defined error with its own name and optional status.
    #[error("{message}")]
    Custom {
        name: String,
        message: String,
        status: Option<StatusCode>,
    },
}

impl CoreError {
    pub fn custom(name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Custom {
            name: name.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Attach a status to a custom error. Other variants keep their own.
    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            CoreError::Custom { name, message, .. } => CoreError::Custom {
                name,
                message,
                status: Some(status),
            },
            other => other,
        }
    }

    /// Stable error name exposed to clients.
    pub fn name(&self) -> &str {
        match self {
            CoreError::MissingParam(_) => "MissingParamError",
            CoreError::AuthTimeout => "AuthTimeoutError",
            CoreError::InvalidToken(_) => "InvalidTokenError",
            CoreError::ResourceNotFound(_) => "ResourceNotFoundError",
            CoreError::ObjectAlreadyExist(_) => "ObjectAlreadyExistError",
            CoreError::FieldIncorrect(_) => "FieldIncorrectError",
            CoreError::NoPermission(_) => "NoPermissionError",
            CoreError::FieldUsed(_) => "FieldUsedError",
            CoreError::UserNotExist => "UserNotExistError",
            CoreError::NotDefined(_) => "NotDefinedError",
            CoreError::PayloadTooLarge(_) => "PayloadTooLargeError",
            CoreError::Store(_) => "SessionStoreError",
            CoreError::Registration(_) => "RegistrationError",
            CoreError::Internal(_) => "InternalError",
            CoreError::Custom { name, .. } => name.as_str(),
        }
    }

    /// Declared status, or 500 when the error declares none.
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::AuthTimeout | CoreError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            CoreError::FieldIncorrect(_) => StatusCode::BAD_REQUEST,
            CoreError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CoreError::Custom {
                status: Some(status),
                ..
            } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            name: self.name().to_string(),
            message: self.to_string(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub name: String,
    pub message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                name = self.name(),
                status = status.as_u16(),
                error = ?self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                name = self.name(),
                status = status.as_u16(),
                message = %self,
                "Request rejected"
            );
        }
        (status, Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_statuses() {
        assert_eq!(CoreError::AuthTimeout.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            CoreError::FieldIncorrect("email".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoreError::MissingParam("token".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CoreError::ResourceNotFound("user".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_custom_error_status() {
        let plain = CoreError::custom("QuotaError", "quota exhausted");
        assert_eq!(plain.name(), "QuotaError");
        assert_eq!(plain.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let teapot = plain.with_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(teapot.status(), StatusCode::IM_A_TEAPOT);

        // Built-in variants keep their own status
        let timeout = CoreError::AuthTimeout.with_status(StatusCode::OK);
        assert_eq!(timeout.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_envelope() {
        let envelope = CoreError::ResourceNotFound("order 7".into()).envelope();
        assert_eq!(envelope.name, "ResourceNotFoundError");
        assert_eq!(envelope.message, "Resource order 7 was not found.");
    }

    #[tokio::test]
    async fn test_auth_timeout_response() {
        let response = CoreError::AuthTimeout.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.name, "AuthTimeoutError");
        assert_eq!(body.message, "Authentication expired, please log in again");
    }
}
