//! Admin dashboard endpoints.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use medcert_core::AdminSummary;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /admin/summary`
pub async fn summary(State(state): State<AppState>) -> Result<Json<AdminSummary>, ApiError> {
    let summary = state.run(|service| service.summary()).await?;
    Ok(Json(summary))
}

/// `GET /admin/summary.csv`: completed consultations as a download.
pub async fn summary_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = state.run(|service| service.summary_csv()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"completed-consultations.csv\"",
            ),
        ],
        csv,
    ))
}
