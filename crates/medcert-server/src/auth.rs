//! Staff sign-in and the bearer-token guard for staff routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /admin/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    if !state.password_matches(&request.password) {
        warn!("Staff login rejected");
        return Err(ApiError::Unauthorized);
    }
    let token = state.open_session()?;
    info!("Staff session opened");
    Ok(Json(LoginResponse { token }))
}

/// `POST /admin/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    state.close_session(token)?;
    info!("Staff session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// Reject requests without a live staff session.
pub async fn require_staff(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = match bearer_token(req.headers()) {
        Some(token) => state.session_valid(token),
        None => Ok(false),
    };
    match authorized {
        Ok(true) => next.run(req).await,
        Ok(false) => ApiError::Unauthorized.into_response(),
        Err(err) => err.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
