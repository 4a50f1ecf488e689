//! Consultation record and its lifecycle enums.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::booking::ValidatedBooking;
use super::symptom::Symptom;

/// Who the leave is for. Fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    /// The customer's own illness.
    Personal,
    /// Caring for a dependent or household member.
    Carer,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Personal => "personal",
            LeaveType::Carer => "carer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(LeaveType::Personal),
            "carer" => Some(LeaveType::Carer),
            _ => None,
        }
    }
}

/// Workflow status of a consultation.
///
/// Legal edges: `pending -> scheduled`, `pending|scheduled -> in_progress`,
/// `in_progress -> completed|declined`. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    /// Created with a payment hold, customer has not confirmed yet
    Pending,
    /// Booking confirmed, call not started
    Scheduled,
    /// Staff has started the call
    InProgress,
    /// Certificate issued, payment captured
    Completed,
    /// Declined, hold voided
    Declined,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::InProgress => "in_progress",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ConsultationStatus::Pending),
            "scheduled" => Some(ConsultationStatus::Scheduled),
            "in_progress" => Some(ConsultationStatus::InProgress),
            "completed" => Some(ConsultationStatus::Completed),
            "declined" => Some(ConsultationStatus::Declined),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Declined
        )
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduled)
                | (Pending, InProgress)
                | (Scheduled, InProgress)
                | (InProgress, Completed)
                | (InProgress, Declined)
        )
    }

    /// Position along the lifecycle; both terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            ConsultationStatus::Pending => 0,
            ConsultationStatus::Scheduled => 1,
            ConsultationStatus::InProgress => 2,
            ConsultationStatus::Completed | ConsultationStatus::Declined => 3,
        }
    }
}

impl std::fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the payment hold backing a consultation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Authorized,
    Captured,
    Voided,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Voided => "voided",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "authorized" => Some(PaymentStatus::Authorized),
            "captured" => Some(PaymentStatus::Captured),
            "voided" => Some(PaymentStatus::Voided),
            _ => None,
        }
    }
}

/// Carer-leave details. Present iff the leave type is `Carer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CareDetails {
    pub recipient_name: String,
    pub relationship: String,
}

/// One booking, from payment hold to clinical and financial outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    /// Opaque ID (UUID v4)
    pub id: String,
    pub leave_type: LeaveType,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    /// Ordered, deduplicated symptom tags
    pub symptoms: Vec<Symptom>,
    pub symptom_details: Option<String>,
    pub symptom_start_date: NaiveDate,
    /// 1 or 2
    pub days_requested: u8,
    pub care: Option<CareDetails>,
    pub preferred_call_time: NaiveDateTime,
    pub status: ConsultationStatus,
    pub payment_status: PaymentStatus,
    /// Provider-side handle of the authorization hold
    pub payment_intent_id: String,
    pub amount_cents: i64,
    pub pharmacist_notes: Option<String>,
    pub call_notes: Option<String>,
    pub decline_reason: Option<String>,
    /// Staff-confirmed days; mirrors `days_requested` until the call starts
    pub days_to_issue: u8,
    /// Set when money moved but the certificate could not be produced
    pub reconciliation_note: Option<String>,
    /// Linked certificate, only for completed consultations
    pub certificate_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Consultation {
    /// Build a fresh `pending` consultation backed by an authorized hold.
    pub fn new(booking: &ValidatedBooking, payment_intent_id: String, amount_cents: i64) -> Self {
        let now = crate::timestamp_now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            leave_type: booking.leave_type,
            first_name: booking.first_name.clone(),
            last_name: booking.last_name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            date_of_birth: booking.date_of_birth,
            symptoms: booking.symptoms.clone(),
            symptom_details: booking.symptom_details.clone(),
            symptom_start_date: booking.symptom_start_date,
            days_requested: booking.days_requested,
            care: booking.care.clone(),
            preferred_call_time: booking.preferred_call_time,
            status: ConsultationStatus::Pending,
            payment_status: PaymentStatus::Authorized,
            payment_intent_id,
            amount_cents,
            pharmacist_notes: None,
            call_notes: None,
            decline_reason: None,
            days_to_issue: booking.days_requested,
            reconciliation_note: None,
            certificate_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the record is waiting on staff to resolve a captured payment
    /// with no certificate.
    pub fn needs_reconciliation(&self) -> bool {
        self.reconciliation_note.is_some()
    }

    /// Check the cross-field invariants that must hold for every stored record
    /// not flagged for reconciliation. Returns the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let has_cert = self.certificate_id.is_some();
        let completed = self.status == ConsultationStatus::Completed;
        let declined = self.status == ConsultationStatus::Declined;

        if completed != has_cert {
            return Err(format!(
                "status {} but certificate present = {}",
                self.status, has_cert
            ));
        }
        if !self.needs_reconciliation()
            && completed != (self.payment_status == PaymentStatus::Captured)
        {
            return Err(format!(
                "status {} with payment {}",
                self.status,
                self.payment_status.as_str()
            ));
        }
        if declined != (self.payment_status == PaymentStatus::Voided) {
            return Err(format!(
                "status {} with payment {}",
                self.status,
                self.payment_status.as_str()
            ));
        }
        if declined && self.decline_reason.as_deref().map_or(true, str::is_empty) {
            return Err("declined without a reason".into());
        }
        if (self.leave_type == LeaveType::Carer) != self.care.is_some() {
            return Err("care details do not match leave type".into());
        }
        if !matches!(self.days_to_issue, 1 | 2) {
            return Err(format!("days_to_issue {} out of range", self.days_to_issue));
        }
        Ok(())
    }
}
