//! API errors and their JSON bodies.
//!
//! Every failure leaves the server as `{"error": {"code", "message", "fields"?}}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medcert_core::{ValidationErrors, WorkflowError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Internal error: {0}")]
    Internal(String),
    /// Upstream failure with the provider detail withheld.
    #[error("Service temporarily unavailable")]
    Unavailable,
}

impl ApiError {
    /// Coarse form for customer routes: upstream detail stays in the logs.
    pub fn for_customer(self) -> Self {
        match self {
            ApiError::Workflow(e @ WorkflowError::Upstream { .. }) => {
                tracing::warn!(error = %e, "Upstream failure on a customer route");
                ApiError::Unavailable
            }
            other => other,
        }
    }

    /// A single-field validation failure on query or path input.
    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::Workflow(WorkflowError::Validation(ValidationErrors::single(
            field, message,
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Unavailable => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_FAILED",
                "We could not reach the payment service. Please try again.".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                internal()
            }
            ApiError::Workflow(err) => match err {
                WorkflowError::Validation(errors) => {
                    fields = Some(errors);
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "VALIDATION_FAILED",
                        "Some fields need attention".to_string(),
                    )
                }
                e @ WorkflowError::Conflict { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATUS", e.to_string())
                }
                WorkflowError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Not found".to_string(),
                ),
                WorkflowError::PaymentDeclined(reason) => (
                    StatusCode::PAYMENT_REQUIRED,
                    "PAYMENT_DECLINED",
                    format!("Payment declined: {reason}"),
                ),
                WorkflowError::HoldExpired => (
                    StatusCode::GONE,
                    "HOLD_EXPIRED",
                    "The payment authorization has expired".to_string(),
                ),
                e @ WorkflowError::Upstream { .. } => {
                    tracing::warn!(error = %e, "Upstream failure");
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED", e.to_string())
                }
                e @ WorkflowError::Reconciliation { .. } => {
                    tracing::error!(error = %e, "Reconciliation required");
                    (StatusCode::CONFLICT, "RECONCILIATION_REQUIRED", e.to_string())
                }
                WorkflowError::Database(e) => {
                    tracing::error!(error = %e, "Database error");
                    internal()
                }
            },
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL",
        "An internal error occurred".to_string(),
    )
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}
