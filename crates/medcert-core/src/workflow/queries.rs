//! Read-only projections. None of these change state.

use super::{ConsultationService, WorkflowError, WorkflowResult};
use crate::audit::AuditTrail;
use crate::export::{AdminSummary, CompletedExport};
use crate::models::{Certificate, CertificateVerification, Consultation, ConsultationStatus};
use crate::search::{rank_by_name, SearchQuery, StatusFilter};

impl ConsultationService {
    pub fn get_consultation(&self, id: &str) -> WorkflowResult<Consultation> {
        self.db()?
            .get_consultation(id)?
            .ok_or(WorkflowError::NotFound)
    }

    /// Consultations in a status bucket, newest first.
    pub fn list(&self, filter: StatusFilter) -> WorkflowResult<Vec<Consultation>> {
        Ok(self.db()?.list_consultations(filter)?)
    }

    /// Customer lookup by free text and/or date of birth. With neither,
    /// every consultation is returned.
    pub fn search(&self, query: &SearchQuery) -> WorkflowResult<Vec<Consultation>> {
        let text = query.text();
        let hits = self.db()?.search_consultations(text, query.dob)?;
        Ok(match text {
            Some(text) => rank_by_name(text, hits),
            None => hits,
        })
    }

    /// The certificate of a completed consultation.
    pub fn get_certificate(&self, id: &str) -> WorkflowResult<Certificate> {
        let db = self.db()?;
        let status = db.get_consultation_status(id)?.ok_or(WorkflowError::NotFound)?;
        if status != ConsultationStatus::Completed {
            return Err(WorkflowError::Conflict {
                id: id.to_string(),
                expected: ConsultationStatus::Completed.to_string(),
                actual: status.to_string(),
            });
        }
        db.get_certificate_for(id)?.ok_or(WorkflowError::NotFound)
    }

    /// Public authenticity check by verification code.
    pub fn verify_certificate(&self, code: &str) -> WorkflowResult<CertificateVerification> {
        let code = code.trim().to_uppercase();
        self.db()?
            .get_certificate_by_code(&code)?
            .map(|cert| CertificateVerification::from(&cert))
            .ok_or(WorkflowError::NotFound)
    }

    /// Consultations where money moved but no certificate exists.
    pub fn list_reconciliation(&self) -> WorkflowResult<Vec<Consultation>> {
        Ok(self.db()?.list_reconciliation()?)
    }

    pub fn audit_trail(&self, id: &str) -> WorkflowResult<AuditTrail> {
        let db = self.db()?;
        if db.get_consultation_status(id)?.is_none() {
            return Err(WorkflowError::NotFound);
        }
        Ok(AuditTrail::from_events(db.list_events(id)?))
    }

    pub fn summary(&self) -> WorkflowResult<AdminSummary> {
        let totals = self.db()?.consultation_totals()?;
        Ok(AdminSummary::from_totals(&totals))
    }

    /// Completed consultations as CSV.
    pub fn summary_csv(&self) -> WorkflowResult<String> {
        let db = self.db()?;
        let export = CompletedExport::collect(&db)?;
        Ok(export.to_csv())
    }
}
