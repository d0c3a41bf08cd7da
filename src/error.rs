use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

static EXPOSE_DETAIL: OnceLock<bool> = OnceLock::new();

/// Include underlying error text in 500 bodies. Set once at startup;
/// defaults to off.
pub fn expose_error_detail(enabled: bool) {
    let _ = EXPOSE_DETAIL.set(enabled);
}

/// One field-level validation failure.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Crate-wide error taxonomy, mapped to one consistent JSON error shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    /// One variant for both unknown identifier and wrong password, so the
    /// two failures are byte-identical on the wire.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{context}")]
    Internal {
        context: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    /// Internal error with an operation-specific client message. The cause
    /// is logged server-side and exposed in the body only in development.
    pub fn internal(context: &'static str, cause: anyhow::Error) -> Self {
        ApiError::Internal { context, cause }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(cause: anyhow::Error) -> Self {
        ApiError::Internal {
            context: "Server error",
            cause,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorBody {
    fn message(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            errors: None,
            error: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    success: false,
                    message: None,
                    errors: Some(errors),
                    error: None,
                },
            ),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg)),
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                ErrorBody::message("Invalid credentials".into()),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::message(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::message(msg)),
            ApiError::Internal { context, cause } => {
                error!(error = ?cause, "internal error");
                let mut body = ErrorBody::message(context.to_string());
                if *EXPOSE_DETAIL.get().unwrap_or(&false) {
                    body.error = Some(cause.to_string());
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Returns the violated constraint name when `err` wraps a Postgres
/// unique-constraint violation (SQLSTATE 23505), `None` otherwise.
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Conflict message for a unique violation on the users table, named after
/// the field the client collided on.
pub fn user_conflict_message(constraint: &str) -> String {
    let field = match constraint {
        "users_email_key" => "Email",
        "users_username_key" => "Username",
        _ => "Account",
    };
    format!("{field} already exists")
}
