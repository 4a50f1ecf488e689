//! In-process payment provider for tests and local runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Authorization, HoldRequest, HoldState, PaymentError, PaymentProvider};

#[derive(Debug, Clone)]
struct MockHold {
    amount_cents: i64,
    state: HoldState,
}

#[derive(Debug, Default)]
struct MockState {
    holds: HashMap<String, MockHold>,
    authorize_failures: VecDeque<PaymentError>,
    capture_failures: VecDeque<PaymentError>,
    void_failures: VecDeque<PaymentError>,
    lose_next_capture_response: bool,
    capture_calls: usize,
    void_calls: usize,
}

/// Payment provider that keeps holds in memory.
///
/// Failures can be queued per operation to exercise error paths.
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside capture and void.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pause(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }

    pub fn decline_next_authorization(&self, reason: &str) {
        self.fail_next_authorization(PaymentError::Declined(reason.to_string()));
    }

    pub fn fail_next_authorization(&self, error: PaymentError) {
        self.state().authorize_failures.push_back(error);
    }

    pub fn fail_next_capture(&self, error: PaymentError) {
        self.state().capture_failures.push_back(error);
    }

    pub fn fail_next_void(&self, error: PaymentError) {
        self.state().void_failures.push_back(error);
    }

    /// The next capture moves the money but reports a transport failure.
    pub fn lose_next_capture_response(&self) {
        self.state().lose_next_capture_response = true;
    }

    /// Let an authorized hold lapse.
    pub fn expire(&self, intent_id: &str) {
        if let Some(hold) = self.state().holds.get_mut(intent_id) {
            if hold.state == HoldState::Authorized {
                hold.state = HoldState::Expired;
            }
        }
    }

    pub fn hold(&self, intent_id: &str) -> Option<HoldState> {
        self.state().holds.get(intent_id).map(|h| h.state)
    }

    pub fn hold_amount(&self, intent_id: &str) -> Option<i64> {
        self.state().holds.get(intent_id).map(|h| h.amount_cents)
    }

    pub fn hold_count(&self) -> usize {
        self.state().holds.len()
    }

    pub fn capture_calls(&self) -> usize {
        self.state().capture_calls
    }

    pub fn void_calls(&self) -> usize {
        self.state().void_calls
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn authorize(&self, request: &HoldRequest) -> Result<Authorization, PaymentError> {
        let mut state = self.state();
        if let Some(error) = state.authorize_failures.pop_front() {
            return Err(error);
        }
        if request.amount_cents <= 0 {
            return Err(PaymentError::Declined("amount must be positive".into()));
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let intent_id = format!("pi_{}", id);
        let client_secret = format!("{}_secret_{}", intent_id, &id[..12]);
        state.holds.insert(
            intent_id.clone(),
            MockHold {
                amount_cents: request.amount_cents,
                state: HoldState::Authorized,
            },
        );
        Ok(Authorization {
            intent_id,
            client_secret,
        })
    }

    fn hold_state(&self, intent_id: &str) -> Result<HoldState, PaymentError> {
        self.state()
            .holds
            .get(intent_id)
            .map(|h| h.state)
            .ok_or_else(|| PaymentError::NotFound(intent_id.to_string()))
    }

    fn capture(&self, intent_id: &str) -> Result<(), PaymentError> {
        self.pause();
        let mut state = self.state();
        state.capture_calls += 1;
        if let Some(error) = state.capture_failures.pop_front() {
            return Err(error);
        }
        let lose_response = std::mem::take(&mut state.lose_next_capture_response);

        let hold = state
            .holds
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::NotFound(intent_id.to_string()))?;
        match hold.state {
            HoldState::Authorized => {
                hold.state = HoldState::Captured;
                if lose_response {
                    return Err(PaymentError::Unavailable("connection reset".into()));
                }
                Ok(())
            }
            HoldState::Expired => Err(PaymentError::HoldExpired(intent_id.to_string())),
            other => Err(PaymentError::InvalidState {
                intent_id: intent_id.to_string(),
                state: other,
            }),
        }
    }

    fn void(&self, intent_id: &str) -> Result<(), PaymentError> {
        self.pause();
        let mut state = self.state();
        state.void_calls += 1;
        if let Some(error) = state.void_failures.pop_front() {
            return Err(error);
        }

        let hold = state
            .holds
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::NotFound(intent_id.to_string()))?;
        match hold.state {
            HoldState::Authorized => {
                hold.state = HoldState::Voided;
                Ok(())
            }
            HoldState::Voided | HoldState::Expired => Ok(()),
            HoldState::Captured => Err(PaymentError::InvalidState {
                intent_id: intent_id.to_string(),
                state: HoldState::Captured,
            }),
        }
    }
}
