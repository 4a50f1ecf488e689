//! Admin summary and CSV export of completed consultations.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::{ConsultationTotals, Database, DbResult};
use crate::search::StatusFilter;

/// Dashboard totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total: i64,
    /// Pending and scheduled together, as staff see them
    pub waiting: i64,
    pub pending: i64,
    pub scheduled: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub declined: i64,
    /// Money actually charged
    pub captured_cents: i64,
    /// Money on hold, not yet captured or voided
    pub held_cents: i64,
    /// Consultations waiting on staff to reconcile a captured payment
    pub reconciliation: i64,
    pub generated_at: String,
}

impl AdminSummary {
    pub fn from_totals(totals: &ConsultationTotals) -> Self {
        Self {
            total: totals.pending
                + totals.scheduled
                + totals.in_progress
                + totals.completed
                + totals.declined,
            waiting: totals.pending + totals.scheduled,
            pending: totals.pending,
            scheduled: totals.scheduled,
            in_progress: totals.in_progress,
            completed: totals.completed,
            declined: totals.declined,
            captured_cents: totals.captured_cents,
            held_cents: totals.held_cents,
            reconciliation: totals.reconciliation,
            generated_at: crate::timestamp_now(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One completed consultation in the export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedRow {
    pub consultation_id: String,
    pub patient_name: String,
    pub leave_type: String,
    pub days_issued: u8,
    pub amount_cents: i64,
    pub captured_at: String,
    pub verification_code: String,
}

/// Every completed consultation, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedExport {
    pub exported_at: String,
    pub rows: Vec<CompletedRow>,
}

impl CompletedExport {
    pub fn collect(db: &Database) -> DbResult<Self> {
        let mut rows = Vec::new();
        for consultation in db.list_consultations(StatusFilter::Completed)? {
            let Some(certificate) = db.get_certificate_for(&consultation.id)? else {
                warn!(consultation_id = %consultation.id, "Completed consultation has no certificate");
                continue;
            };
            rows.push(CompletedRow {
                patient_name: consultation.full_name(),
                leave_type: consultation.leave_type.as_str().to_string(),
                days_issued: consultation.days_to_issue,
                amount_cents: consultation.amount_cents,
                captured_at: certificate.issued_at,
                verification_code: certificate.verification_code,
                consultation_id: consultation.id,
            });
        }
        Ok(Self {
            exported_at: crate::timestamp_now(),
            rows,
        })
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str(
            "consultation_id,patient_name,leave_type,days_issued,amount,captured_at,verification_code\n",
        );

        for row in &self.rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                escape_csv(&row.consultation_id),
                escape_csv(&row.patient_name),
                row.leave_type,
                row.days_issued,
                format_dollars(row.amount_cents),
                escape_csv(&row.captured_at),
                escape_csv(&row.verification_code),
            ));
        }

        csv
    }
}

/// `2495` → `24.95`
fn format_dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
