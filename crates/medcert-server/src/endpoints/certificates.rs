//! `GET /certificates/verify/:code`: public authenticity check.

use axum::extract::{Path, State};
use axum::Json;
use medcert_core::CertificateVerification;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn verify(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CertificateVerification>, ApiError> {
    let verification = state
        .run(move |service| service.verify_certificate(&code))
        .await?;
    Ok(Json(verification))
}
