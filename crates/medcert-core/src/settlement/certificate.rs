//! Certificate document generation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::audit::hash_data;
use crate::models::{CertifiedPeriod, LeaveType, Practitioner};

/// Certificate generation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Certificate generation failed: {0}")]
    Generation(String),

    #[error("No unique verification code after {0} attempts")]
    CodeExhausted(usize),

    #[error("Certificate could not be stored: {0}")]
    Storage(String),
}

/// Everything printed on a certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRequest {
    pub consultation_id: String,
    pub patient_name: String,
    pub date_of_birth: NaiveDate,
    pub leave_type: LeaveType,
    pub care_recipient_name: Option<String>,
    pub care_relationship: Option<String>,
    pub period: CertifiedPeriod,
    pub practitioner: Practitioner,
    pub issued_at: String,
}

/// A rendered document and the code that verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCertificate {
    pub verification_code: String,
    pub document: String,
}

/// External certificate artifact generator.
///
/// Each call should produce a fresh verification code; the caller retries
/// when a code collides with an existing one.
pub trait CertificateGenerator: Send + Sync {
    fn generate(&self, request: &CertificateRequest) -> Result<GeneratedCertificate, CertificateError>;
}

/// Renders certificates as plain text.
#[derive(Debug, Clone, Default)]
pub struct TextCertificateGenerator;

impl TextCertificateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `XXXX-XXXX` code from a hash of the consultation and a random nonce.
    fn verification_code(request: &CertificateRequest) -> String {
        let nonce = uuid::Uuid::new_v4();
        let digest = hash_data(
            format!("{}|{}|{}", request.consultation_id, request.issued_at, nonce).as_bytes(),
        );
        let code = digest[..8].to_uppercase();
        format!("{}-{}", &code[..4], &code[4..])
    }
}

impl CertificateGenerator for TextCertificateGenerator {
    fn generate(&self, request: &CertificateRequest) -> Result<GeneratedCertificate, CertificateError> {
        if request.patient_name.trim().is_empty() {
            return Err(CertificateError::Generation("patient name is empty".into()));
        }
        let verification_code = Self::verification_code(request);
        let date = |d: NaiveDate| d.format("%d %B %Y").to_string();

        let mut lines = vec![
            "MEDICAL CERTIFICATE".to_string(),
            String::new(),
            format!("Patient: {}", request.patient_name),
            format!("Date of birth: {}", date(request.date_of_birth)),
        ];
        match request.leave_type {
            LeaveType::Personal => {
                lines.push("Purpose: personal leave".to_string());
            }
            LeaveType::Carer => {
                lines.push("Purpose: carer's leave".to_string());
                if let Some(name) = &request.care_recipient_name {
                    let relationship = request.care_relationship.as_deref().unwrap_or("dependent");
                    lines.push(format!("Caring for: {} ({})", name, relationship));
                }
            }
        }
        let days = request.period.days();
        lines.push(format!(
            "Unfit for work from {} to {} inclusive ({} day{})",
            date(request.period.start),
            date(request.period.end),
            days,
            if days == 1 { "" } else { "s" }
        ));
        lines.push(String::new());
        lines.push(format!(
            "Issued by {} (registration {})",
            request.practitioner.name, request.practitioner.registration_number
        ));
        lines.push(format!("Issued at: {}", request.issued_at));
        lines.push(format!("Verification code: {}", verification_code));

        Ok(GeneratedCertificate {
            verification_code,
            document: lines.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(leave_type: LeaveType) -> CertificateRequest {
        let start = NaiveDate::from_ymd_opt(2026, 5, 11).unwrap();
        CertificateRequest {
            consultation_id: "c1".into(),
            patient_name: "Mia Nguyen".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
            leave_type,
            care_recipient_name: (leave_type == LeaveType::Carer).then(|| "Leo".to_string()),
            care_relationship: (leave_type == LeaveType::Carer).then(|| "Son".to_string()),
            period: CertifiedPeriod::starting(start, 2),
            practitioner: Practitioner {
                name: "Dana Price".into(),
                registration_number: "PHA0001234567".into(),
            },
            issued_at: "2026-05-12T01:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_document_contents() {
        let generated = TextCertificateGenerator::new()
            .generate(&request(LeaveType::Personal))
            .unwrap();
        assert!(generated.document.contains("Mia Nguyen"));
        assert!(generated.document.contains("11 May 2026 to 12 May 2026"));
        assert!(generated.document.contains("(2 days)"));
        assert!(generated.document.contains("PHA0001234567"));
        assert!(generated.document.contains(&generated.verification_code));
    }

    #[test]
    fn test_carer_document_names_recipient() {
        let generated = TextCertificateGenerator::new()
            .generate(&request(LeaveType::Carer))
            .unwrap();
        assert!(generated.document.contains("Caring for: Leo (Son)"));
    }

    #[test]
    fn test_code_shape_and_freshness() {
        let generator = TextCertificateGenerator::new();
        let a = generator.generate(&request(LeaveType::Personal)).unwrap();
        let b = generator.generate(&request(LeaveType::Personal)).unwrap();

        assert_eq!(a.verification_code.len(), 9);
        assert_eq!(&a.verification_code[4..5], "-");
        assert!(a
            .verification_code
            .chars()
            .all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(a.verification_code, b.verification_code);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut req = request(LeaveType::Personal);
        req.patient_name = " ".into();
        assert!(TextCertificateGenerator::new().generate(&req).is_err());
    }
}
