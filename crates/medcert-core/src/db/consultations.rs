//! Consultation database operations.
//!
//! Every status change is a conditional update guarded on the expected
//! pre-state; a `false` return means another actor got there first.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::json;

use super::events::append_event;
use super::{parse_date, parse_datetime, Database, DbError, DbResult, DATETIME_FORMAT, DATE_FORMAT};
use crate::audit::EventKind;
use crate::intake::normalize_phone;
use crate::models::{
    CareDetails, Certificate, Consultation, ConsultationStatus, LeaveType, PaymentStatus, Symptom,
};
use crate::search::StatusFilter;

/// Short-lived claim taken before a terminal action reaches the payment
/// provider, so two terminal actions can never run side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementClaim {
    Issuing,
    Declining,
}

impl SettlementClaim {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementClaim::Issuing => "issuing",
            SettlementClaim::Declining => "declining",
        }
    }
}

/// Totals backing the admin summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultationTotals {
    pub pending: i64,
    pub scheduled: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub declined: i64,
    pub captured_cents: i64,
    pub held_cents: i64,
    pub reconciliation: i64,
}

const SELECT_CONSULTATION: &str = r#"
    SELECT c.id, c.leave_type, c.first_name, c.last_name, c.email, c.phone,
           c.date_of_birth, c.symptoms, c.symptom_details, c.symptom_start_date,
           c.days_requested, c.care_recipient_name, c.care_relationship,
           c.preferred_call_time, c.status, c.payment_status, c.payment_intent_id,
           c.amount_cents, c.pharmacist_notes, c.call_notes, c.decline_reason,
           c.days_to_issue, c.reconciliation_note, c.created_at, c.updated_at,
           cert.id
    FROM consultations c
    LEFT JOIN certificates cert ON cert.consultation_id = c.id
"#;

impl Database {
    /// Insert a new consultation together with its `created` event.
    pub fn create_consultation(&self, consultation: &Consultation) -> DbResult<()> {
        let symptoms_json = serde_json::to_string(&consultation.symptoms)?;
        let (care_name, care_relationship) = match &consultation.care {
            Some(care) => (Some(care.recipient_name.as_str()), Some(care.relationship.as_str())),
            None => (None, None),
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO consultations (
                id, leave_type, first_name, last_name, email, phone, date_of_birth,
                symptoms, symptom_details, symptom_start_date, days_requested,
                care_recipient_name, care_relationship, preferred_call_time,
                status, payment_status, payment_intent_id, amount_cents,
                pharmacist_notes, call_notes, decline_reason, days_to_issue,
                reconciliation_note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)
            "#,
            params![
                consultation.id,
                consultation.leave_type.as_str(),
                consultation.first_name,
                consultation.last_name,
                consultation.email,
                consultation.phone,
                consultation.date_of_birth.format(DATE_FORMAT).to_string(),
                symptoms_json,
                consultation.symptom_details,
                consultation.symptom_start_date.format(DATE_FORMAT).to_string(),
                consultation.days_requested,
                care_name,
                care_relationship,
                consultation.preferred_call_time.format(DATETIME_FORMAT).to_string(),
                consultation.status.as_str(),
                consultation.payment_status.as_str(),
                consultation.payment_intent_id,
                consultation.amount_cents,
                consultation.pharmacist_notes,
                consultation.call_notes,
                consultation.decline_reason,
                consultation.days_to_issue,
                consultation.reconciliation_note,
                consultation.created_at,
                consultation.updated_at,
            ],
        )?;
        append_event(
            &tx,
            &consultation.id,
            EventKind::Created,
            &json!({
                "leaveType": consultation.leave_type.as_str(),
                "amountCents": consultation.amount_cents,
                "paymentIntentId": consultation.payment_intent_id,
            }),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get a consultation by ID.
    pub fn get_consultation(&self, id: &str) -> DbResult<Option<Consultation>> {
        let sql = format!("{SELECT_CONSULTATION} WHERE c.id = ?");
        self.conn
            .query_row(&sql, [id], read_row)
            .optional()?
            .map(Consultation::try_from)
            .transpose()
    }

    /// Current status only, for reporting conflicts.
    pub fn get_consultation_status(&self, id: &str) -> DbResult<Option<ConsultationStatus>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT status FROM consultations WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|s| string_to_status(&s)).transpose()
    }

    /// Move `id` to `to` if its status is one of `from` and no settlement is
    /// running. Records `kind` in the event chain on success.
    pub fn transition_status(
        &self,
        id: &str,
        from: &[ConsultationStatus],
        to: ConsultationStatus,
        kind: EventKind,
    ) -> DbResult<bool> {
        if from.is_empty() || from.iter().any(|f| !f.can_transition_to(to)) {
            return Err(DbError::Constraint(format!(
                "Illegal transition to {} from {:?}",
                to, from
            )));
        }
        let allowed: Vec<String> = from.iter().map(|s| format!("'{}'", s.as_str())).collect();
        let sql = format!(
            "UPDATE consultations SET status = ?1, updated_at = ?2 \
             WHERE id = ?3 AND status IN ({}) AND settlement_claim IS NULL",
            allowed.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(&sql, params![to.as_str(), crate::timestamp_now(), id])?;
        if rows_affected == 0 {
            return Ok(false);
        }
        append_event(&tx, id, kind, &json!({ "status": to.as_str() }))?;
        tx.commit()?;
        Ok(true)
    }

    /// Replace pharmacist notes while the call is in progress.
    pub fn update_pharmacist_notes(&self, id: &str, notes: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE consultations SET pharmacist_notes = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'in_progress' AND settlement_claim IS NULL
            "#,
            params![id, notes, crate::timestamp_now()],
        )?;
        if rows_affected == 0 {
            return Ok(false);
        }
        append_event(&tx, id, EventKind::NotesUpdated, &json!({ "length": notes.len() }))?;
        tx.commit()?;
        Ok(true)
    }

    /// Take the settlement claim on an `in_progress` consultation.
    ///
    /// A claim taken before `stale_before` is treated as abandoned and can be
    /// taken over.
    pub fn claim_settlement(
        &self,
        id: &str,
        claim: SettlementClaim,
        stale_before: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE consultations
            SET settlement_claim = ?2, settlement_claimed_at = ?3
            WHERE id = ?1 AND status = 'in_progress'
              AND (settlement_claim IS NULL OR settlement_claimed_at < ?4)
            "#,
            params![id, claim.as_str(), crate::timestamp_now(), stale_before],
        )?;
        Ok(rows_affected > 0)
    }

    /// Release a claim after a failed settlement, recording why.
    pub fn release_settlement_claim(
        &self,
        id: &str,
        claim: SettlementClaim,
        reason: &str,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE consultations SET settlement_claim = NULL, settlement_claimed_at = NULL
            WHERE id = ?1 AND settlement_claim = ?2
            "#,
            params![id, claim.as_str()],
        )?;
        if rows_affected == 0 {
            return Ok(false);
        }
        append_event(
            &tx,
            id,
            EventKind::SettlementFailed,
            &json!({ "action": claim.as_str(), "reason": reason }),
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Finish an issue: store the certificate and mark completed/captured in
    /// one transaction. Requires the `issuing` claim.
    pub fn complete_consultation(
        &self,
        id: &str,
        certificate: &Certificate,
        call_notes: &str,
        days_to_issue: u8,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE consultations SET
                status = 'completed',
                payment_status = 'captured',
                call_notes = ?2,
                days_to_issue = ?3,
                reconciliation_note = NULL,
                settlement_claim = NULL,
                settlement_claimed_at = NULL,
                updated_at = ?4
            WHERE id = ?1 AND status = 'in_progress' AND settlement_claim = 'issuing'
            "#,
            params![id, call_notes, days_to_issue, crate::timestamp_now()],
        )?;
        if rows_affected == 0 {
            return Ok(false);
        }
        super::certificates::insert_certificate(&tx, certificate)?;
        append_event(
            &tx,
            id,
            EventKind::Issued,
            &json!({
                "certificateId": certificate.id,
                "verificationCode": certificate.verification_code,
                "daysToIssue": days_to_issue,
            }),
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Finish a decline: mark declined/voided and keep the reason verbatim.
    /// Requires the `declining` claim.
    pub fn decline_consultation(
        &self,
        id: &str,
        reason: &str,
        call_notes: Option<&str>,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE consultations SET
                status = 'declined',
                payment_status = 'voided',
                decline_reason = ?2,
                call_notes = COALESCE(?3, call_notes),
                settlement_claim = NULL,
                settlement_claimed_at = NULL,
                updated_at = ?4
            WHERE id = ?1 AND status = 'in_progress' AND settlement_claim = 'declining'
            "#,
            params![id, reason, call_notes, crate::timestamp_now()],
        )?;
        if rows_affected == 0 {
            return Ok(false);
        }
        append_event(&tx, id, EventKind::Declined, &json!({ "reason": reason }))?;
        tx.commit()?;
        Ok(true)
    }

    /// Payment was captured but no certificate could be stored. Keep the
    /// consultation in progress, record the capture and flag it for staff.
    pub fn flag_reconciliation(
        &self,
        id: &str,
        note: &str,
        call_notes: &str,
        days_to_issue: u8,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE consultations SET
                payment_status = 'captured',
                reconciliation_note = ?2,
                call_notes = ?3,
                days_to_issue = ?4,
                settlement_claim = NULL,
                settlement_claimed_at = NULL,
                updated_at = ?5
            WHERE id = ?1 AND status = 'in_progress' AND settlement_claim = 'issuing'
            "#,
            params![id, note, call_notes, days_to_issue, crate::timestamp_now()],
        )?;
        if rows_affected == 0 {
            return Ok(false);
        }
        append_event(&tx, id, EventKind::ReconciliationRequired, &json!({ "note": note }))?;
        tx.commit()?;
        Ok(true)
    }

    /// List consultations in a status bucket, newest first.
    pub fn list_consultations(&self, filter: StatusFilter) -> DbResult<Vec<Consultation>> {
        let statuses = filter.statuses();
        let sql = if statuses.is_empty() {
            format!("{SELECT_CONSULTATION} ORDER BY c.created_at DESC, c.id")
        } else {
            let allowed: Vec<String> =
                statuses.iter().map(|s| format!("'{}'", s.as_str())).collect();
            format!(
                "{SELECT_CONSULTATION} WHERE c.status IN ({}) ORDER BY c.created_at DESC, c.id",
                allowed.join(", ")
            )
        };
        self.query_consultations(&sql, [])
    }

    /// Free-text match over name, email and phone, plus exact date of birth.
    /// Either criterion may be omitted.
    pub fn search_consultations(
        &self,
        text: Option<&str>,
        date_of_birth: Option<NaiveDate>,
    ) -> DbResult<Vec<Consultation>> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let text_pattern = text.map(|t| like_pattern(&t.to_lowercase()));
        let phone_pattern = text
            .map(|t| {
                normalize_phone(t)
                    .chars()
                    .filter(|c| c.is_ascii_digit())
                    .collect::<String>()
            })
            .filter(|digits| !digits.is_empty())
            .map(|digits| like_pattern(&digits));
        let dob = date_of_birth.map(|d| d.format(DATE_FORMAT).to_string());

        let sql = format!(
            r#"{SELECT_CONSULTATION}
            WHERE (?1 IS NULL
                   OR lower(c.first_name) LIKE ?1 ESCAPE '\'
                   OR lower(c.last_name) LIKE ?1 ESCAPE '\'
                   OR lower(c.first_name || ' ' || c.last_name) LIKE ?1 ESCAPE '\'
                   OR lower(c.email) LIKE ?1 ESCAPE '\'
                   OR (?2 IS NOT NULL AND c.phone LIKE ?2 ESCAPE '\'))
              AND (?3 IS NULL OR c.date_of_birth = ?3)
            ORDER BY c.created_at DESC, c.id"#
        );
        self.query_consultations(&sql, params![text_pattern, phone_pattern, dob])
    }

    /// Consultations with a captured payment but no certificate.
    pub fn list_reconciliation(&self) -> DbResult<Vec<Consultation>> {
        let sql = format!(
            "{SELECT_CONSULTATION} WHERE c.reconciliation_note IS NOT NULL ORDER BY c.updated_at"
        );
        self.query_consultations(&sql, [])
    }

    /// Counts and money totals across all consultations.
    pub fn consultation_totals(&self) -> DbResult<ConsultationTotals> {
        let mut totals = ConsultationTotals::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM consultations GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (status, count) = row?;
            match string_to_status(&status)? {
                ConsultationStatus::Pending => totals.pending = count,
                ConsultationStatus::Scheduled => totals.scheduled = count,
                ConsultationStatus::InProgress => totals.in_progress = count,
                ConsultationStatus::Completed => totals.completed = count,
                ConsultationStatus::Declined => totals.declined = count,
            }
        }

        let (captured, held, reconciliation): (i64, i64, i64) = self.conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN payment_status = 'captured' THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN payment_status = 'authorized' THEN amount_cents END), 0),
                COUNT(reconciliation_note)
            FROM consultations
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        totals.captured_cents = captured;
        totals.held_cents = held;
        totals.reconciliation = reconciliation;

        Ok(totals)
    }

    fn query_consultations<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<Consultation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_row)?;

        let mut consultations = Vec::new();
        for row in rows {
            consultations.push(row?.try_into()?);
        }
        Ok(consultations)
    }
}

/// Escape LIKE wildcards and wrap in `%...%`.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Intermediate row struct for database mapping.
struct ConsultationRow {
    id: String,
    leave_type: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: String,
    symptoms: String,
    symptom_details: Option<String>,
    symptom_start_date: String,
    days_requested: u8,
    care_recipient_name: Option<String>,
    care_relationship: Option<String>,
    preferred_call_time: String,
    status: String,
    payment_status: String,
    payment_intent_id: String,
    amount_cents: i64,
    pharmacist_notes: Option<String>,
    call_notes: Option<String>,
    decline_reason: Option<String>,
    days_to_issue: u8,
    reconciliation_note: Option<String>,
    created_at: String,
    updated_at: String,
    certificate_id: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ConsultationRow> {
    Ok(ConsultationRow {
        id: row.get(0)?,
        leave_type: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        date_of_birth: row.get(6)?,
        symptoms: row.get(7)?,
        symptom_details: row.get(8)?,
        symptom_start_date: row.get(9)?,
        days_requested: row.get(10)?,
        care_recipient_name: row.get(11)?,
        care_relationship: row.get(12)?,
        preferred_call_time: row.get(13)?,
        status: row.get(14)?,
        payment_status: row.get(15)?,
        payment_intent_id: row.get(16)?,
        amount_cents: row.get(17)?,
        pharmacist_notes: row.get(18)?,
        call_notes: row.get(19)?,
        decline_reason: row.get(20)?,
        days_to_issue: row.get(21)?,
        reconciliation_note: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
        certificate_id: row.get(25)?,
    })
}

impl TryFrom<ConsultationRow> for Consultation {
    type Error = DbError;

    fn try_from(row: ConsultationRow) -> Result<Self, Self::Error> {
        let symptoms: Vec<Symptom> = serde_json::from_str(&row.symptoms)?;
        let leave_type = LeaveType::parse(&row.leave_type)
            .ok_or_else(|| DbError::Constraint(format!("Unknown leave type: {}", row.leave_type)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown payment status: {}", row.payment_status))
        })?;
        let care = match (row.care_recipient_name, row.care_relationship) {
            (Some(recipient_name), Some(relationship)) => Some(CareDetails {
                recipient_name,
                relationship,
            }),
            _ => None,
        };

        Ok(Consultation {
            id: row.id,
            leave_type,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: parse_date("date_of_birth", &row.date_of_birth)?,
            symptoms,
            symptom_details: row.symptom_details,
            symptom_start_date: parse_date("symptom_start_date", &row.symptom_start_date)?,
            days_requested: row.days_requested,
            care,
            preferred_call_time: parse_datetime("preferred_call_time", &row.preferred_call_time)?,
            status: string_to_status(&row.status)?,
            payment_status,
            payment_intent_id: row.payment_intent_id,
            amount_cents: row.amount_cents,
            pharmacist_notes: row.pharmacist_notes,
            call_notes: row.call_notes,
            decline_reason: row.decline_reason,
            days_to_issue: row.days_to_issue,
            reconciliation_note: row.reconciliation_note,
            certificate_id: row.certificate_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn string_to_status(s: &str) -> Result<ConsultationStatus, DbError> {
    ConsultationStatus::parse(s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown consultation status: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::sample_consultation;
    use ConsultationStatus::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn far_past() -> String {
        "1970-01-01T00:00:00.000Z".to_string()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();

        let retrieved = db.get_consultation(&consultation.id).unwrap().unwrap();
        assert_eq!(retrieved, consultation);
        assert_eq!(retrieved.status, Pending);
        assert_eq!(retrieved.payment_status, PaymentStatus::Authorized);
        assert!(retrieved.certificate_id.is_none());
    }

    #[test]
    fn test_carer_round_trip() {
        let db = setup_db();
        let consultation = sample_consultation("Jo", "Park", LeaveType::Carer);
        db.create_consultation(&consultation).unwrap();

        let retrieved = db.get_consultation(&consultation.id).unwrap().unwrap();
        assert_eq!(retrieved.care, consultation.care);
        assert!(retrieved.care.is_some());
    }

    #[test]
    fn test_missing_is_none() {
        let db = setup_db();
        assert!(db.get_consultation("nope").unwrap().is_none());
        assert!(db.get_consultation_status("nope").unwrap().is_none());
    }

    #[test]
    fn test_transition_is_guarded() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();
        let id = &consultation.id;

        assert!(db
            .transition_status(id, &[Pending, Scheduled], InProgress, EventKind::CallStarted)
            .unwrap());
        // Second start finds the wrong pre-state.
        assert!(!db
            .transition_status(id, &[Pending, Scheduled], InProgress, EventKind::CallStarted)
            .unwrap());
        assert_eq!(db.get_consultation_status(id).unwrap(), Some(InProgress));
    }

    #[test]
    fn test_illegal_edge_refused() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();

        let result =
            db.transition_status(&consultation.id, &[Pending], Completed, EventKind::Issued);
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_only_one_claim_wins() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();
        let id = &consultation.id;
        db.transition_status(id, &[Pending], InProgress, EventKind::CallStarted)
            .unwrap();

        assert!(db
            .claim_settlement(id, SettlementClaim::Issuing, &far_past())
            .unwrap());
        assert!(!db
            .claim_settlement(id, SettlementClaim::Declining, &far_past())
            .unwrap());

        // Notes are locked while a settlement runs.
        assert!(!db.update_pharmacist_notes(id, "x").unwrap());

        assert!(db
            .release_settlement_claim(id, SettlementClaim::Issuing, "capture failed")
            .unwrap());
        assert!(db
            .claim_settlement(id, SettlementClaim::Declining, &far_past())
            .unwrap());
    }

    #[test]
    fn test_stale_claim_can_be_taken_over() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();
        let id = &consultation.id;
        db.transition_status(id, &[Pending], InProgress, EventKind::CallStarted)
            .unwrap();

        db.claim_settlement(id, SettlementClaim::Issuing, &far_past())
            .unwrap();
        let future = "9999-01-01T00:00:00.000Z";
        assert!(db
            .claim_settlement(id, SettlementClaim::Declining, future)
            .unwrap());
    }

    #[test]
    fn test_decline_requires_claim() {
        let db = setup_db();
        let consultation = sample_consultation("Mia", "Nguyen", LeaveType::Personal);
        db.create_consultation(&consultation).unwrap();
        let id = &consultation.id;
        db.transition_status(id, &[Pending], InProgress, EventKind::CallStarted)
            .unwrap();

        assert!(!db.decline_consultation(id, "referred to GP", None).unwrap());

        db.claim_settlement(id, SettlementClaim::Declining, &far_past())
            .unwrap();
        assert!(db
            .decline_consultation(id, "referred to GP", Some("advised GP visit"))
            .unwrap());

        let declined = db.get_consultation(id).unwrap().unwrap();
        assert_eq!(declined.status, Declined);
        assert_eq!(declined.payment_status, PaymentStatus::Voided);
        assert_eq!(declined.decline_reason.as_deref(), Some("referred to GP"));
        assert_eq!(declined.call_notes.as_deref(), Some("advised GP visit"));
    }

    #[test]
    fn test_list_by_bucket() {
        let db = setup_db();
        let a = sample_consultation("Ann", "Lee", LeaveType::Personal);
        let b = sample_consultation("Ben", "Ray", LeaveType::Personal);
        let c = sample_consultation("Cat", "Ng", LeaveType::Personal);
        for consultation in [&a, &b, &c] {
            db.create_consultation(consultation).unwrap();
        }
        db.transition_status(&b.id, &[Pending], Scheduled, EventKind::Confirmed)
            .unwrap();
        db.transition_status(&c.id, &[Pending], InProgress, EventKind::CallStarted)
            .unwrap();

        assert_eq!(db.list_consultations(StatusFilter::All).unwrap().len(), 3);
        assert_eq!(db.list_consultations(StatusFilter::Pending).unwrap().len(), 2);
        let scheduled = db.list_consultations(StatusFilter::Scheduled).unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, b.id);
        assert!(db
            .list_consultations(StatusFilter::Completed)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_search_text_and_dob() {
        let db = setup_db();
        let mut a = sample_consultation("Ann", "Lee", LeaveType::Personal);
        a.email = "ann.lee@example.com".into();
        a.phone = "0411222333".into();
        let mut b = sample_consultation("Annabel", "Stone", LeaveType::Personal);
        b.date_of_birth = NaiveDate::from_ymd_opt(1975, 6, 30).unwrap();
        for consultation in [&a, &b] {
            db.create_consultation(consultation).unwrap();
        }

        assert_eq!(db.search_consultations(Some("ann"), None).unwrap().len(), 2);
        assert_eq!(db.search_consultations(Some("ANN LEE"), None).unwrap().len(), 1);
        assert_eq!(db.search_consultations(Some("example.com"), None).unwrap().len(), 1);
        assert_eq!(db.search_consultations(Some("0411 222"), None).unwrap().len(), 1);
        assert_eq!(db.search_consultations(Some("+61 411 222 333"), None).unwrap().len(), 1);
        assert_eq!(db.search_consultations(Some("61411222333"), None).unwrap().len(), 1);

        let by_dob = db.search_consultations(Some("ann"), Some(b.date_of_birth)).unwrap();
        assert_eq!(by_dob.len(), 1);
        assert_eq!(by_dob[0].id, b.id);

        assert!(db.search_consultations(Some("zed"), None).unwrap().is_empty());
        assert!(db.search_consultations(Some("100%"), None).unwrap().is_empty());
    }

    #[test]
    fn test_totals() {
        let db = setup_db();
        let a = sample_consultation("Ann", "Lee", LeaveType::Personal);
        let b = sample_consultation("Ben", "Ray", LeaveType::Personal);
        db.create_consultation(&a).unwrap();
        db.create_consultation(&b).unwrap();
        db.transition_status(&b.id, &[Pending], InProgress, EventKind::CallStarted)
            .unwrap();
        db.claim_settlement(&b.id, SettlementClaim::Declining, &far_past())
            .unwrap();
        db.decline_consultation(&b.id, "not suitable", None).unwrap();

        let totals = db.consultation_totals().unwrap();
        assert_eq!(totals.pending, 1);
        assert_eq!(totals.declined, 1);
        assert_eq!(totals.held_cents, a.amount_cents);
        assert_eq!(totals.captured_cents, 0);
        assert_eq!(totals.reconciliation, 0);
    }
}
