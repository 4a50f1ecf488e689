//! Booking payloads: the raw intake submission and its validated form.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::consultation::{CareDetails, LeaveType};
use super::symptom::Symptom;

fn default_days_requested() -> u8 {
    1
}

/// Booking payload as submitted by the customer.
///
/// Dates and times are kept as raw strings so that malformed input surfaces
/// as a field-level validation error instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub leave_type: LeaveType,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub care_recipient_name: Option<String>,
    #[serde(default)]
    pub care_relationship: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    #[serde(default)]
    pub symptom_details: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub symptom_start_date: String,
    #[serde(default = "default_days_requested")]
    pub days_requested: u8,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub preferred_date: String,
    /// `HH:MM`, one of the half-hour call slots
    #[serde(default)]
    pub preferred_time: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

impl BookingRequest {
    /// Empty request for the given leave type, as the intake form starts.
    pub fn new(leave_type: LeaveType) -> Self {
        Self {
            leave_type,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            date_of_birth: String::new(),
            care_recipient_name: None,
            care_relationship: None,
            symptoms: Vec::new(),
            symptom_details: None,
            symptom_start_date: String::new(),
            days_requested: default_days_requested(),
            preferred_date: String::new(),
            preferred_time: String::new(),
            terms_accepted: false,
        }
    }
}

/// A booking that passed every intake rule, with typed dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub leave_type: LeaveType,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Digits only, with a leading `+` kept for international form
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub care: Option<CareDetails>,
    pub symptoms: Vec<Symptom>,
    pub symptom_details: Option<String>,
    pub symptom_start_date: NaiveDate,
    pub days_requested: u8,
    pub preferred_call_time: NaiveDateTime,
}
