//! Staff review actions: start call, notes, issue, decline.

use tracing::{info, warn};

use super::{ConsultationService, DeclineRequest, IssueRequest, WorkflowError, WorkflowResult};
use crate::audit::EventKind;
use crate::db::SettlementClaim;
use crate::models::{Certificate, Consultation, ConsultationStatus, PaymentStatus};

const CALL_START_FROM: [ConsultationStatus; 2] =
    [ConsultationStatus::Pending, ConsultationStatus::Scheduled];

impl ConsultationService {
    /// `pending | scheduled → in_progress`. No payment effect.
    pub fn start_call(&self, id: &str) -> WorkflowResult<Consultation> {
        let started = self.db()?.transition_status(
            id,
            &CALL_START_FROM,
            ConsultationStatus::InProgress,
            EventKind::CallStarted,
        )?;
        if !started {
            return Err(self.conflict(id, &CALL_START_FROM));
        }
        info!(consultation_id = id, "Call started");
        self.get_consultation(id)
    }

    /// Replace the pharmacist notes while the call is running.
    pub fn update_notes(&self, id: &str, notes: &str) -> WorkflowResult<Consultation> {
        let updated = self.db()?.update_pharmacist_notes(id, notes)?;
        if !updated {
            return Err(self.conflict(id, &[ConsultationStatus::InProgress]));
        }
        self.get_consultation(id)
    }

    /// `in_progress → completed`: capture the fee and issue the certificate.
    ///
    /// On any failure the consultation stays `in_progress`. If the fee was
    /// captured but no certificate could be stored the error is
    /// [`WorkflowError::Reconciliation`], and calling this again retries the
    /// certificate without capturing a second time.
    pub fn issue_certificate(&self, id: &str, request: &IssueRequest) -> WorkflowResult<Certificate> {
        request.validate()?;
        let consultation = self.claim(id, SettlementClaim::Issuing)?;

        let result = self.engine.capture_and_issue(
            &consultation,
            &self.settings.practitioner,
            request.notes.trim(),
            request.days_to_issue,
        );
        match &result {
            Ok(_) => {}
            // Already flagged, which released the claim.
            Err(WorkflowError::Reconciliation { .. }) => {}
            Err(e) => self.release(id, SettlementClaim::Issuing, e),
        }
        result
    }

    /// `in_progress → declined`: void the hold and keep the reason.
    pub fn decline(&self, id: &str, request: &DeclineRequest) -> WorkflowResult<Consultation> {
        request.validate()?;
        let consultation = self.claim(id, SettlementClaim::Declining)?;

        if consultation.payment_status == PaymentStatus::Captured {
            let err = WorkflowError::Reconciliation {
                id: id.to_string(),
                message: "payment already captured; finish issuing or refund manually".into(),
            };
            self.release(id, SettlementClaim::Declining, &err);
            return Err(err);
        }

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Err(e) = self
            .engine
            .void_and_decline(&consultation, request.reason.trim(), notes)
        {
            self.release(id, SettlementClaim::Declining, &e);
            return Err(e);
        }
        self.get_consultation(id)
    }

    /// Take the settlement claim and return the consultation as it stands
    /// under the claim.
    fn claim(&self, id: &str, claim: SettlementClaim) -> WorkflowResult<Consultation> {
        let cutoff = self.settings.stale_claim_cutoff();
        let db = self.db()?;
        let status = db.get_consultation_status(id)?.ok_or(WorkflowError::NotFound)?;
        if status != ConsultationStatus::InProgress {
            return Err(WorkflowError::Conflict {
                id: id.to_string(),
                expected: ConsultationStatus::InProgress.to_string(),
                actual: status.to_string(),
            });
        }
        if !db.claim_settlement(id, claim, &cutoff)? {
            drop(db);
            return Err(match self.conflict(id, &[ConsultationStatus::InProgress]) {
                WorkflowError::Conflict { id, expected, actual } if actual == expected => {
                    WorkflowError::Conflict {
                        id,
                        expected,
                        actual: "in_progress with a settlement already running".into(),
                    }
                }
                other => other,
            });
        }
        db.get_consultation(id)?.ok_or(WorkflowError::NotFound)
    }

    fn release(&self, id: &str, claim: SettlementClaim, cause: &WorkflowError) {
        warn!(consultation_id = id, action = claim.as_str(), error = %cause, "Settlement failed");
        let released = self
            .db()
            .and_then(|db| Ok(db.release_settlement_claim(id, claim, &cause.to_string())?));
        if let Err(e) = released {
            warn!(consultation_id = id, error = %e, "Could not release settlement claim");
        }
    }
}
