//! Certificate records produced when a consultation completes.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::consultation::LeaveType;

/// Practitioner details printed on every certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    pub name: String,
    pub registration_number: String,
}

/// Inclusive range of dates covered by a certificate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CertifiedPeriod {
    /// Period of `days` days starting on `start`.
    pub fn starting(start: NaiveDate, days: u8) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start,
            end: start + Duration::days(span),
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A generated certificate, linked 1:1 to a completed consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub consultation_id: String,
    /// Short public code used to check authenticity
    pub verification_code: String,
    pub patient_name: String,
    pub date_of_birth: NaiveDate,
    pub leave_type: LeaveType,
    pub care_recipient_name: Option<String>,
    pub period: CertifiedPeriod,
    pub practitioner: Practitioner,
    /// Rendered certificate document
    pub document: String,
    pub issued_at: String,
}

/// Public view returned by certificate verification; no contact details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateVerification {
    pub verification_code: String,
    pub patient_name: String,
    pub period: CertifiedPeriod,
    pub practitioner: Practitioner,
    pub issued_at: String,
}

impl From<&Certificate> for CertificateVerification {
    fn from(cert: &Certificate) -> Self {
        Self {
            verification_code: cert.verification_code.clone(),
            patient_name: cert.patient_name.clone(),
            period: cert.period,
            practitioner: cert.practitioner.clone(),
            issued_at: cert.issued_at.clone(),
        }
    }
}
