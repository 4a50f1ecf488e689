//! Certificate database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_date, Database, DbError, DbResult, DATE_FORMAT};
use crate::models::{Certificate, CertifiedPeriod, LeaveType, Practitioner};

const SELECT_CERTIFICATE: &str = r#"
    SELECT id, consultation_id, verification_code, patient_name, date_of_birth,
           leave_type, care_recipient_name, start_date, end_date,
           practitioner_name, practitioner_registration, document, issued_at
    FROM certificates
"#;

/// Insert a certificate. Called inside the completion transaction only.
pub(crate) fn insert_certificate(conn: &Connection, certificate: &Certificate) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO certificates (
            id, consultation_id, verification_code, patient_name, date_of_birth,
            leave_type, care_recipient_name, start_date, end_date,
            practitioner_name, practitioner_registration, document, issued_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            certificate.id,
            certificate.consultation_id,
            certificate.verification_code,
            certificate.patient_name,
            certificate.date_of_birth.format(DATE_FORMAT).to_string(),
            certificate.leave_type.as_str(),
            certificate.care_recipient_name,
            certificate.period.start.format(DATE_FORMAT).to_string(),
            certificate.period.end.format(DATE_FORMAT).to_string(),
            certificate.practitioner.name,
            certificate.practitioner.registration_number,
            certificate.document,
            certificate.issued_at,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Get the certificate issued for a consultation.
    pub fn get_certificate_for(&self, consultation_id: &str) -> DbResult<Option<Certificate>> {
        let sql = format!("{SELECT_CERTIFICATE} WHERE consultation_id = ?");
        self.conn
            .query_row(&sql, [consultation_id], read_row)
            .optional()?
            .map(Certificate::try_from)
            .transpose()
    }

    /// Look up a certificate by its public verification code.
    pub fn get_certificate_by_code(&self, code: &str) -> DbResult<Option<Certificate>> {
        let sql = format!("{SELECT_CERTIFICATE} WHERE verification_code = ?");
        self.conn
            .query_row(&sql, [code], read_row)
            .optional()?
            .map(Certificate::try_from)
            .transpose()
    }

    /// Whether a verification code is already taken.
    pub fn verification_code_exists(&self, code: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM certificates WHERE verification_code = ?",
            [code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Intermediate row struct for database mapping.
struct CertificateRow {
    id: String,
    consultation_id: String,
    verification_code: String,
    patient_name: String,
    date_of_birth: String,
    leave_type: String,
    care_recipient_name: Option<String>,
    start_date: String,
    end_date: String,
    practitioner_name: String,
    practitioner_registration: String,
    document: String,
    issued_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CertificateRow> {
    Ok(CertificateRow {
        id: row.get(0)?,
        consultation_id: row.get(1)?,
        verification_code: row.get(2)?,
        patient_name: row.get(3)?,
        date_of_birth: row.get(4)?,
        leave_type: row.get(5)?,
        care_recipient_name: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        practitioner_name: row.get(9)?,
        practitioner_registration: row.get(10)?,
        document: row.get(11)?,
        issued_at: row.get(12)?,
    })
}

impl TryFrom<CertificateRow> for Certificate {
    type Error = DbError;

    fn try_from(row: CertificateRow) -> Result<Self, Self::Error> {
        let leave_type = LeaveType::parse(&row.leave_type)
            .ok_or_else(|| DbError::Constraint(format!("Unknown leave type: {}", row.leave_type)))?;

        Ok(Certificate {
            id: row.id,
            consultation_id: row.consultation_id,
            verification_code: row.verification_code,
            patient_name: row.patient_name,
            date_of_birth: parse_date("date_of_birth", &row.date_of_birth)?,
            leave_type,
            care_recipient_name: row.care_recipient_name,
            period: CertifiedPeriod {
                start: parse_date("start_date", &row.start_date)?,
                end: parse_date("end_date", &row.end_date)?,
            },
            practitioner: Practitioner {
                name: row.practitioner_name,
                registration_number: row.practitioner_registration,
            },
            document: row.document,
            issued_at: row.issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::EventKind;
    use crate::db::testing::{sample_certificate, sample_consultation};
    use crate::db::SettlementClaim;
    use crate::models::ConsultationStatus;

    fn in_progress(db: &Database) -> String {
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();
        db.transition_status(
            &consultation.id,
            &[ConsultationStatus::Pending],
            ConsultationStatus::InProgress,
            EventKind::CallStarted,
        )
        .unwrap();
        consultation.id
    }

    #[test]
    fn test_complete_stores_certificate() {
        let db = Database::open_in_memory().unwrap();
        let id = in_progress(&db);
        db.claim_settlement(&id, SettlementClaim::Issuing, "1970-01-01T00:00:00.000Z")
            .unwrap();

        let certificate = sample_certificate(&id, "ABCD-1234");
        assert!(db.complete_consultation(&id, &certificate, "fine", 1).unwrap());

        let stored = db.get_certificate_for(&id).unwrap().unwrap();
        assert_eq!(stored, certificate);

        let by_code = db.get_certificate_by_code("ABCD-1234").unwrap().unwrap();
        assert_eq!(by_code.consultation_id, id);
        assert!(db.verification_code_exists("ABCD-1234").unwrap());

        let consultation = db.get_consultation(&id).unwrap().unwrap();
        assert_eq!(consultation.certificate_id.as_deref(), Some(certificate.id.as_str()));
        assert!(consultation.check_invariants().is_ok());
    }

    #[test]
    fn test_complete_without_claim_stores_nothing() {
        let db = Database::open_in_memory().unwrap();
        let id = in_progress(&db);

        let certificate = sample_certificate(&id, "ABCD-1234");
        assert!(!db.complete_consultation(&id, &certificate, "fine", 1).unwrap());
        assert!(db.get_certificate_for(&id).unwrap().is_none());
    }

    #[test]
    fn test_unknown_code() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_certificate_by_code("NOPE").unwrap().is_none());
        assert!(!db.verification_code_exists("NOPE").unwrap());
    }
}
