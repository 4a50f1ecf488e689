//! Consultation service: booking, staff review and read projections.
//!
//! Every state change goes through a status-guarded update in the
//! database, so concurrent staff actions on one consultation resolve to a
//! single winner and the rest receive [`WorkflowError::Conflict`].

mod booking;
mod queries;
mod review;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::intake::ValidationErrors;
use crate::models::{ConsultationStatus, Practitioner};
use crate::payment::{FeeSchedule, PaymentProvider};
use crate::settlement::{CertificateGenerator, CertificateMailer, SettlementEngine};

/// Workflow errors, as surfaced to customers and staff.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Consultation {id} is {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment authorization has expired")]
    HoldExpired,

    #[error("{step} failed: {message}")]
    Upstream { step: String, message: String },

    #[error("Consultation {id} needs reconciliation: {message}")]
    Reconciliation { id: String, message: String },

    #[error("Consultation not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(DbError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<DbError> for WorkflowError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => WorkflowError::NotFound,
            other => WorkflowError::Database(other),
        }
    }
}

impl From<ValidationErrors> for WorkflowError {
    fn from(e: ValidationErrors) -> Self {
        WorkflowError::Validation(e)
    }
}

impl<T> From<std::sync::PoisonError<T>> for WorkflowError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        WorkflowError::Database(DbError::from(e))
    }
}

/// Business policy for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Printed on every certificate
    pub practitioner: Practitioner,
    pub fees: FeeSchedule,
    /// Offset from UTC used to decide what "today" is for intake rules
    pub utc_offset_hours: i32,
    /// Age after which an unfinished settlement claim may be taken over
    pub settlement_claim_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            practitioner: Practitioner {
                name: "Registered Pharmacist".to_string(),
                registration_number: "PHA0000000000".to_string(),
            },
            fees: FeeSchedule::default(),
            utc_offset_hours: 10,
            settlement_claim_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl ServiceSettings {
    /// Local business date.
    pub fn today(&self) -> NaiveDate {
        (Utc::now() + chrono::Duration::hours(i64::from(self.utc_offset_hours))).date_naive()
    }

    /// Claims taken before this instant count as abandoned.
    fn stale_claim_cutoff(&self) -> String {
        let timeout = chrono::Duration::from_std(self.settlement_claim_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        (Utc::now() - timeout).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// Result of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    pub consultation_id: String,
    /// Handle the customer's browser uses to complete the hold
    pub client_secret: String,
    pub amount_cents: i64,
}

/// Staff input for issuing a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default)]
    pub notes: String,
    pub days_to_issue: u8,
}

impl IssueRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.notes.trim().is_empty() {
            errors.add("notes", "Call notes are required");
        }
        if !matches!(self.days_to_issue, 1 | 2) {
            errors.add("daysToIssue", "Certificates cover 1 or 2 days");
        }
        errors.into_result(())
    }
}

/// Staff input for declining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DeclineRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.reason.trim().is_empty() {
            return Err(ValidationErrors::single("reason", "A decline reason is required"));
        }
        Ok(())
    }
}

/// Thread-safe entry point for every consultation operation.
pub struct ConsultationService {
    db: Arc<Mutex<Database>>,
    payments: Arc<dyn PaymentProvider>,
    engine: SettlementEngine,
    settings: ServiceSettings,
}

impl ConsultationService {
    pub fn new(
        db: Database,
        payments: Arc<dyn PaymentProvider>,
        generator: Arc<dyn CertificateGenerator>,
        mailer: Arc<dyn CertificateMailer>,
        settings: ServiceSettings,
    ) -> Self {
        let db = Arc::new(Mutex::new(db));
        let engine = SettlementEngine::new(db.clone(), payments.clone(), generator, mailer);
        Self {
            db,
            payments,
            engine,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn db(&self) -> WorkflowResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    /// Build the error for a guarded update that matched nothing.
    fn conflict(&self, id: &str, expected: &[ConsultationStatus]) -> WorkflowError {
        let expected = expected
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        match self.db().and_then(|db| Ok(db.get_consultation_status(id)?)) {
            Ok(Some(actual)) => WorkflowError::Conflict {
                id: id.to_string(),
                expected,
                actual: actual.to_string(),
            },
            Ok(None) => WorkflowError::NotFound,
            Err(e) => e,
        }
    }
}
