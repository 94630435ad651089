//! HTTP error type and the JSON error envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::error::CrmError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Invalid {field}. Must be one of: {}", valid.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        valid: Vec<String>,
    },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Can't find {0} on this server!")]
    RouteNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(AuthError),

    /// The detail is logged, never sent to the client.
    #[error("Something went wrong! Please try again later.")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::InvalidEnumValue { .. }
            | ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error name for the `errorType` field.
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "ValidationError",
            ApiError::InvalidEnumValue { .. } => "InvalidEnumValue",
            ApiError::MalformedRequest(_) => "MalformedRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::RouteNotFound(_) => "RouteNotFound",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation { field, .. } => Some(json!({ "field": field })),
            ApiError::InvalidEnumValue {
                field,
                value,
                valid,
            } => Some(json!({ "field": field, "value": value, "valid": valid })),
            ApiError::Unauthorized(kind) => Some(json!({ "reason": kind.kind() })),
            _ => None,
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::Validation { field, message } => ApiError::Validation { field, message },
            CrmError::InvalidEnumValue {
                field,
                value,
                valid,
            } => ApiError::InvalidEnumValue {
                field,
                value,
                valid,
            },
            CrmError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            CrmError::Conflict(msg) => ApiError::Conflict(msg),
            CrmError::Auth(kind) => ApiError::Unauthorized(kind),
            other @ (CrmError::Config(_)
            | CrmError::Storage(_)
            | CrmError::Io(_)
            | CrmError::Json(_)) => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(detail) => error!(error = %detail, "request failed"),
            ApiError::Unauthorized(kind) => warn!(reason = kind.kind(), "rejected admin request"),
            _ => {}
        }

        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
            "errorType": self.error_type(),
        });
        if let (Some(details), Some(obj)) = (self.details(), body.as_object_mut()) {
            obj.insert("details".to_string(), details);
        }

        (status, Json(body)).into_response()
    }
}
