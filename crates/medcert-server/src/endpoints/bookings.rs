//! Customer-facing booking endpoints.
//!
//! - `POST /bookings`: validate, place the payment hold, create the record
//! - `POST /bookings/:id/confirm`: hold completed client-side
//!
//! Upstream failures reach the customer without provider detail.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use medcert_core::{BookingCreated, BookingRequest, Consultation};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreated>), ApiError> {
    let Json(request) = payload?;
    let created = state
        .run(move |service| service.create_booking(&request))
        .await
        .map_err(ApiError::for_customer)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Consultation>, ApiError> {
    let consultation = state
        .run(move |service| service.confirm_booking(&id))
        .await
        .map_err(ApiError::for_customer)?;
    Ok(Json(consultation))
}
