//! Medcert Core Library
//!
//! Booking, payment and fulfillment workflow for phone-issued medical
//! certificates.
//!
//! # Architecture
//!
//! ```text
//! Intake form (Identity → Symptoms → Scheduling → Payment)
//!                          │
//!              authorize hold + insert record
//!                          │
//!                    [pending] ──confirm──► [scheduled]
//!                          │                    │
//!                          └──── start call ────┘
//!                                   │
//!                             [in_progress]
//!                                   │
//!                  ┌────────────────┴────────────────┐
//!                  ▼                                 ▼
//!          capture + certificate                 void hold
//!             [completed]                        [declined]
//! ```
//!
//! # Core Principle
//!
//! **The customer is charged only when a certificate is issued.** The fee is
//! held at booking time and either captured or voided once a staff member
//! has completed the call.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence with status-guarded updates
//! - [`models`]: Domain types (Consultation, Certificate, BookingRequest, etc.)
//! - [`intake`]: Multi-step intake form and validation rules
//! - [`payment`]: Payment provider contract and fee schedule
//! - [`settlement`]: Capture-and-issue and void-and-decline
//! - [`workflow`]: Consultation service driving the status state machine
//! - [`search`]: Status buckets and customer lookup
//! - [`audit`]: Hash-chained consultation event trail
//! - [`export`]: Admin summary and CSV export

pub mod audit;
pub mod db;
pub mod export;
pub mod intake;
pub mod models;
pub mod payment;
pub mod search;
pub mod settlement;
pub mod workflow;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditTrail, EventKind};
pub use db::{Database, DbError};
pub use export::AdminSummary;
pub use intake::{IntakeForm, IntakeStep, ValidationErrors};
pub use models::{
    BookingRequest, Certificate, CertificateVerification, Consultation, ConsultationStatus,
    LeaveType, PaymentStatus, Practitioner, Symptom,
};
pub use payment::{FeeSchedule, MockPaymentProvider, PaymentError, PaymentProvider};
pub use search::{SearchQuery, StatusFilter};
pub use settlement::{CertificateGenerator, CertificateMailer, TextCertificateGenerator};
pub use workflow::{
    BookingCreated, ConsultationService, DeclineRequest, IssueRequest, ServiceSettings,
    WorkflowError, WorkflowResult,
};

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// Fixed width, so stored timestamps order correctly as text.
pub(crate) fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
