//! Capture-and-issue and void-and-decline.
//!
//! Both operations expect the caller to hold the matching settlement claim
//! on the consultation. The database lock is only taken for individual
//! reads and writes, never across a provider call.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{error, info, warn};

use super::{CertificateError, CertificateGenerator, CertificateMailer, CertificateRequest};
use crate::audit::EventKind;
use crate::db::{Database, DbError};
use crate::models::{Certificate, CertifiedPeriod, Consultation, PaymentStatus, Practitioner};
use crate::payment::{HoldState, PaymentError, PaymentProvider};
use crate::workflow::{WorkflowError, WorkflowResult};

/// Attempts at finding an unused verification code.
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct SettlementEngine {
    db: Arc<Mutex<Database>>,
    payments: Arc<dyn PaymentProvider>,
    generator: Arc<dyn CertificateGenerator>,
    mailer: Arc<dyn CertificateMailer>,
}

impl SettlementEngine {
    pub fn new(
        db: Arc<Mutex<Database>>,
        payments: Arc<dyn PaymentProvider>,
        generator: Arc<dyn CertificateGenerator>,
        mailer: Arc<dyn CertificateMailer>,
    ) -> Self {
        Self {
            db,
            payments,
            generator,
            mailer,
        }
    }

    /// Capture the hold, then generate and store the certificate.
    ///
    /// A capture failure leaves everything as it was. A failure after the
    /// money moved flags the consultation for reconciliation and returns
    /// [`WorkflowError::Reconciliation`].
    pub fn capture_and_issue(
        &self,
        consultation: &Consultation,
        practitioner: &Practitioner,
        call_notes: &str,
        days_to_issue: u8,
    ) -> WorkflowResult<Certificate> {
        if consultation.payment_status == PaymentStatus::Captured {
            info!(
                consultation_id = %consultation.id,
                "Payment already captured, retrying certificate only"
            );
        } else {
            self.capture(consultation)?;
        }

        let certificate =
            match self.store_certificate(consultation, practitioner, call_notes, days_to_issue) {
                Ok(certificate) => certificate,
                Err(e) => {
                    return Err(self.flag_reconciliation(consultation, &e, call_notes, days_to_issue))
                }
            };

        info!(
            consultation_id = %consultation.id,
            certificate_id = %certificate.id,
            amount_cents = consultation.amount_cents,
            "Certificate issued and payment captured"
        );
        self.deliver(consultation, &certificate);
        Ok(certificate)
    }

    /// Release the hold and record the decline.
    pub fn void_and_decline(
        &self,
        consultation: &Consultation,
        reason: &str,
        call_notes: Option<&str>,
    ) -> WorkflowResult<()> {
        let intent_id = consultation.payment_intent_id.as_str();
        match self.payments.void(intent_id) {
            Ok(()) => {}
            Err(PaymentError::HoldExpired(_))
            | Err(PaymentError::NotFound(_))
            | Err(PaymentError::InvalidState {
                state: HoldState::Voided | HoldState::Expired,
                ..
            }) => {
                info!(consultation_id = %consultation.id, "Hold already released");
            }
            Err(PaymentError::InvalidState {
                state: HoldState::Captured,
                ..
            }) => {
                error!(consultation_id = %consultation.id, "Cannot void a captured hold");
                return Err(WorkflowError::Reconciliation {
                    id: consultation.id.clone(),
                    message: "payment was already captured; refund required".into(),
                });
            }
            Err(e) => {
                warn!(consultation_id = %consultation.id, error = %e, "Void failed");
                return Err(upstream("void", e));
            }
        }

        let declined = self
            .db
            .lock()?
            .decline_consultation(&consultation.id, reason, call_notes)?;
        if !declined {
            return Err(WorkflowError::Conflict {
                id: consultation.id.clone(),
                expected: "in_progress (declining)".into(),
                actual: "settlement claim lost".into(),
            });
        }

        info!(consultation_id = %consultation.id, "Consultation declined, hold voided");
        Ok(())
    }

    /// Capture unless the provider shows the money already moved.
    fn capture(&self, consultation: &Consultation) -> WorkflowResult<()> {
        let intent_id = consultation.payment_intent_id.as_str();
        let state = match self.payments.hold_state(intent_id) {
            Ok(state) => state,
            // The provider no longer knows the hold; it cannot come back.
            Err(PaymentError::NotFound(_)) => {
                warn!(consultation_id = %consultation.id, "Hold unknown to the provider");
                return Err(WorkflowError::HoldExpired);
            }
            Err(e) => return Err(upstream("hold_state", e)),
        };

        match state {
            HoldState::Captured => {
                warn!(
                    consultation_id = %consultation.id,
                    "Hold already captured at provider, not capturing again"
                );
                Ok(())
            }
            HoldState::Voided | HoldState::Expired => {
                warn!(consultation_id = %consultation.id, ?state, "Hold no longer capturable");
                Err(WorkflowError::HoldExpired)
            }
            HoldState::Authorized => match self.payments.capture(intent_id) {
                Ok(()) => Ok(()),
                Err(PaymentError::Declined(reason)) => Err(WorkflowError::PaymentDeclined(reason)),
                Err(PaymentError::HoldExpired(_)) | Err(PaymentError::NotFound(_)) => {
                    Err(WorkflowError::HoldExpired)
                }
                Err(e) => {
                    // The capture may have landed even though the call failed.
                    if let Ok(HoldState::Captured) = self.payments.hold_state(intent_id) {
                        warn!(consultation_id = %consultation.id, error = %e, "Capture reported failure but landed");
                        return Ok(());
                    }
                    warn!(consultation_id = %consultation.id, error = %e, "Capture failed");
                    Err(upstream("capture", e))
                }
            },
        }
    }

    fn store_certificate(
        &self,
        consultation: &Consultation,
        practitioner: &Practitioner,
        call_notes: &str,
        days_to_issue: u8,
    ) -> Result<Certificate, CertificateError> {
        let request = CertificateRequest {
            consultation_id: consultation.id.clone(),
            patient_name: consultation.full_name(),
            date_of_birth: consultation.date_of_birth,
            leave_type: consultation.leave_type,
            care_recipient_name: consultation.care.as_ref().map(|c| c.recipient_name.clone()),
            care_relationship: consultation.care.as_ref().map(|c| c.relationship.clone()),
            period: CertifiedPeriod::starting(consultation.symptom_start_date, days_to_issue),
            practitioner: practitioner.clone(),
            issued_at: crate::timestamp_now(),
        };

        let mut generated = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = self.generator.generate(&request)?;
            let taken = self
                .db
                .lock()
                .map_err(|e| CertificateError::Storage(e.to_string()))?
                .verification_code_exists(&candidate.verification_code)
                .map_err(|e| CertificateError::Storage(e.to_string()))?;
            if !taken {
                generated = Some(candidate);
                break;
            }
        }
        let generated = generated.ok_or(CertificateError::CodeExhausted(MAX_CODE_ATTEMPTS))?;

        let certificate = Certificate {
            id: uuid::Uuid::new_v4().to_string(),
            consultation_id: consultation.id.clone(),
            verification_code: generated.verification_code,
            patient_name: request.patient_name,
            date_of_birth: request.date_of_birth,
            leave_type: request.leave_type,
            care_recipient_name: request.care_recipient_name,
            period: request.period,
            practitioner: request.practitioner,
            document: generated.document,
            issued_at: request.issued_at,
        };

        let stored = self
            .db
            .lock()
            .map_err(|e| CertificateError::Storage(e.to_string()))?
            .complete_consultation(&consultation.id, &certificate, call_notes, days_to_issue)
            .map_err(|e| CertificateError::Storage(e.to_string()))?;
        if !stored {
            return Err(CertificateError::Storage(
                "settlement claim lost before the certificate was stored".into(),
            ));
        }
        Ok(certificate)
    }

    /// Record a captured payment with no certificate and build the error
    /// staff will see.
    fn flag_reconciliation(
        &self,
        consultation: &Consultation,
        cause: &CertificateError,
        call_notes: &str,
        days_to_issue: u8,
    ) -> WorkflowError {
        let note = format!("Payment captured but no certificate issued: {}", cause);
        error!(consultation_id = %consultation.id, %cause, "Reconciliation required");

        let flagged = self.db.lock().map_err(DbError::from).and_then(|db| {
            db.flag_reconciliation(&consultation.id, &note, call_notes, days_to_issue)
        });
        match flagged {
            Ok(true) => {}
            Ok(false) => error!(
                consultation_id = %consultation.id,
                "Could not flag reconciliation: settlement claim lost"
            ),
            Err(e) => error!(
                consultation_id = %consultation.id,
                error = %e,
                "Could not flag reconciliation"
            ),
        }

        WorkflowError::Reconciliation {
            id: consultation.id.clone(),
            message: note,
        }
    }

    fn deliver(&self, consultation: &Consultation, certificate: &Certificate) {
        if let Err(e) = self.mailer.send(&consultation.email, certificate) {
            warn!(consultation_id = %consultation.id, error = %e, "Certificate delivery failed");
            let recorded = self.db.lock().map_err(DbError::from).and_then(|db| {
                db.record_event(
                    &consultation.id,
                    EventKind::DeliveryFailed,
                    &json!({ "recipient": consultation.email, "error": e.to_string() }),
                )
            });
            if let Err(e) = recorded {
                warn!(consultation_id = %consultation.id, error = %e, "Could not record delivery failure");
            }
        }
    }
}

fn upstream(step: &'static str, e: PaymentError) -> WorkflowError {
    WorkflowError::Upstream {
        step: step.to_string(),
        message: e.to_string(),
    }
}
