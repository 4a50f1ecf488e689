//! Certificate delivery. Best effort: failures never undo an issue.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::info;

use crate::models::Certificate;

/// Delivery errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery to {recipient} failed: {reason}")]
    Failed { recipient: String, reason: String },
}

/// External email delivery. Retries belong to the delivery provider.
pub trait CertificateMailer: Send + Sync {
    fn send(&self, recipient: &str, certificate: &Certificate) -> Result<(), DeliveryError>;
}

/// Writes a log line instead of sending mail.
#[derive(Debug, Clone, Default)]
pub struct LoggingMailer;

impl CertificateMailer for LoggingMailer {
    fn send(&self, recipient: &str, certificate: &Certificate) -> Result<(), DeliveryError> {
        info!(
            consultation_id = %certificate.consultation_id,
            verification_code = %certificate.verification_code,
            recipient,
            "Certificate queued for delivery"
        );
        Ok(())
    }
}

/// A message captured by [`OutboxMailer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentCertificate {
    pub recipient: String,
    pub certificate_id: String,
    pub verification_code: String,
}

#[derive(Debug, Default)]
struct Outbox {
    sent: Vec<SentCertificate>,
    failing: bool,
}

/// Keeps sent certificates in memory.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    outbox: Mutex<Outbox>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following send fail.
    pub fn set_failing(&self, failing: bool) {
        self.outbox().failing = failing;
    }

    pub fn sent(&self) -> Vec<SentCertificate> {
        self.outbox().sent.clone()
    }
}

impl CertificateMailer for OutboxMailer {
    fn send(&self, recipient: &str, certificate: &Certificate) -> Result<(), DeliveryError> {
        let mut outbox = self.outbox();
        if outbox.failing {
            return Err(DeliveryError::Failed {
                recipient: recipient.to_string(),
                reason: "mail relay rejected the message".into(),
            });
        }
        outbox.sent.push(SentCertificate {
            recipient: recipient.to_string(),
            certificate_id: certificate.id.clone(),
            verification_code: certificate.verification_code.clone(),
        });
        Ok(())
    }
}
