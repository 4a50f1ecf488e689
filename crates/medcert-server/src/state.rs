//! Shared handler state: the consultation service and staff sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use medcert_core::{ConsultationService, WorkflowResult};

use crate::error::ApiError;

/// Staff sessions expire after a working day.
pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    service: Arc<ConsultationService>,
    sessions: Arc<Mutex<SessionStore>>,
    staff_password: Arc<str>,
}

impl AppState {
    pub fn new(service: ConsultationService, staff_password: &str) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(Mutex::new(SessionStore::new(SESSION_TTL))),
            staff_password: Arc::from(staff_password),
        }
    }

    pub fn service(&self) -> &ConsultationService {
        &self.service
    }

    /// Run a blocking service call off the async runtime.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&ConsultationService) -> WorkflowResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let result = tokio::task::spawn_blocking(move || f(&service)).await?;
        Ok(result?)
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.staff_password.as_bytes(), candidate.as_bytes())
    }

    pub fn open_session(&self) -> Result<String, ApiError> {
        Ok(self.sessions()?.open())
    }

    pub fn session_valid(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self.sessions()?.is_valid(token))
    }

    pub fn close_session(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self.sessions()?.close(token))
    }

    fn sessions(&self) -> Result<std::sync::MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))
    }
}

/// Opaque bearer tokens for signed-in staff.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    tokens: HashMap<String, Instant>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: HashMap::new(),
        }
    }

    pub fn open(&mut self) -> String {
        self.prune();
        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        self.tokens.insert(token.clone(), Instant::now());
        token
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|opened| opened.elapsed() < self.ttl)
    }

    pub fn close(&mut self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn prune(&mut self) {
        let ttl = self.ttl;
        self.tokens.retain(|_, opened| opened.elapsed() < ttl);
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
