//! Staff endpoints for reviewing consultations.
//!
//! - `GET /consultations?status=`: list by status bucket
//! - `GET /consultations/search?q=&dob=`: customer lookup
//! - `GET /consultations/reconciliation`: captured payments without a certificate
//! - `GET /consultations/:id`: full projection
//! - `POST /consultations/:id/start-call`
//! - `PUT /consultations/:id/notes`
//! - `POST /consultations/:id/issue`
//! - `POST /consultations/:id/decline`
//! - `GET /consultations/:id/certificate`
//! - `GET /consultations/:id/events`: audit chain

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use medcert_core::{
    AuditTrail, Certificate, Consultation, DeclineRequest, IssueRequest, SearchQuery,
    StatusFilter,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub dob: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    #[serde(default)]
    pub notes: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Consultation>>, ApiError> {
    let raw = query.status.unwrap_or_default();
    let filter = StatusFilter::parse(raw.trim())
        .ok_or_else(|| ApiError::invalid("status", "Unknown status filter"))?;
    let consultations = state.run(move |service| service.list(filter)).await?;
    Ok(Json(consultations))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Consultation>>, ApiError> {
    let dob = match params.dob.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ApiError::invalid("dob", "Use the format YYYY-MM-DD"))?,
        ),
        None => None,
    };
    let query = SearchQuery { q: params.q, dob };
    let hits = state.run(move |service| service.search(&query)).await?;
    Ok(Json(hits))
}

pub async fn reconciliation(
    State(state): State<AppState>,
) -> Result<Json<Vec<Consultation>>, ApiError> {
    let flagged = state.run(|service| service.list_reconciliation()).await?;
    Ok(Json(flagged))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Consultation>, ApiError> {
    let consultation = state.run(move |service| service.get_consultation(&id)).await?;
    Ok(Json(consultation))
}

pub async fn start_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Consultation>, ApiError> {
    let consultation = state.run(move |service| service.start_call(&id)).await?;
    Ok(Json(consultation))
}

pub async fn update_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NotesBody>, JsonRejection>,
) -> Result<Json<Consultation>, ApiError> {
    let Json(body) = payload?;
    let consultation = state
        .run(move |service| service.update_notes(&id, &body.notes))
        .await?;
    Ok(Json(consultation))
}

pub async fn issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<Certificate>, ApiError> {
    let Json(request) = payload?;
    let certificate = state
        .run(move |service| service.issue_certificate(&id, &request))
        .await?;
    Ok(Json(certificate))
}

pub async fn decline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<DeclineRequest>, JsonRejection>,
) -> Result<Json<Consultation>, ApiError> {
    let Json(request) = payload?;
    let consultation = state
        .run(move |service| service.decline(&id, &request))
        .await?;
    Ok(Json(consultation))
}

pub async fn certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    let certificate = state.run(move |service| service.get_certificate(&id)).await?;
    Ok(Json(certificate))
}

pub async fn events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AuditTrail>, ApiError> {
    let trail = state.run(move |service| service.audit_trail(&id)).await?;
    Ok(Json(trail))
}
