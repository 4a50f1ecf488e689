//! Payment provider contract: authorize now, capture or void later.

mod mock;

pub use mock::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::LeaveType;

/// Currency all fees are charged in.
pub const CURRENCY: &str = "aud";

/// Flat consultation fee per leave type, in cents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeSchedule {
    pub personal_cents: i64,
    pub carer_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            personal_cents: 2495,
            carer_cents: 2495,
        }
    }
}

impl FeeSchedule {
    pub fn fee_for(&self, leave_type: LeaveType) -> i64 {
        match leave_type {
            LeaveType::Personal => self.personal_cents,
            LeaveType::Carer => self.carer_cents,
        }
    }
}

/// Request for an authorization hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub receipt_email: String,
}

/// A created hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Provider-side handle used for capture and void
    pub intent_id: String,
    /// Handle the customer's browser uses to confirm card details
    pub client_secret: String,
}

/// Provider-side state of a hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    Authorized,
    Captured,
    Voided,
    /// Lapsed on the provider side without being captured
    Expired,
}

/// Payment provider errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Unknown payment intent: {0}")]
    NotFound(String),

    #[error("Payment intent {intent_id} is {state:?}")]
    InvalidState { intent_id: String, state: HoldState },

    #[error("Authorization hold expired: {0}")]
    HoldExpired(String),

    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

/// External payment provider.
///
/// `void` must be safe to retry. `authorize` and `capture` are not, so
/// callers check `hold_state` before repeating a capture.
pub trait PaymentProvider: Send + Sync {
    fn authorize(&self, request: &HoldRequest) -> Result<Authorization, PaymentError>;

    fn hold_state(&self, intent_id: &str) -> Result<HoldState, PaymentError>;

    fn capture(&self, intent_id: &str) -> Result<(), PaymentError>;

    fn void(&self, intent_id: &str) -> Result<(), PaymentError>;
}
