//! Tamper-evident audit trail for consultations.
//!
//! Each consultation has its own append-only chain of events. An event's
//! hash covers the previous event's hash plus its own content, so editing
//! or dropping any stored event breaks every hash after it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Audit errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Chain broken at event {seq}: {reason}")]
    BrokenChain { seq: i64, reason: String },
}

pub type AuditResult<T> = Result<T, AuditError>;

/// What happened to a consultation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Confirmed,
    CallStarted,
    NotesUpdated,
    Issued,
    Declined,
    SettlementFailed,
    ReconciliationRequired,
    DeliveryFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Confirmed => "confirmed",
            EventKind::CallStarted => "call_started",
            EventKind::NotesUpdated => "notes_updated",
            EventKind::Issued => "issued",
            EventKind::Declined => "declined",
            EventKind::SettlementFailed => "settlement_failed",
            EventKind::ReconciliationRequired => "reconciliation_required",
            EventKind::DeliveryFailed => "delivery_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(EventKind::Created),
            "confirmed" => Some(EventKind::Confirmed),
            "call_started" => Some(EventKind::CallStarted),
            "notes_updated" => Some(EventKind::NotesUpdated),
            "issued" => Some(EventKind::Issued),
            "declined" => Some(EventKind::Declined),
            "settlement_failed" => Some(EventKind::SettlementFailed),
            "reconciliation_required" => Some(EventKind::ReconciliationRequired),
            "delivery_failed" => Some(EventKind::DeliveryFailed),
            _ => None,
        }
    }
}

/// One link in a consultation's event chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub consultation_id: String,
    /// 1-based position in the chain
    pub seq: i64,
    pub kind: EventKind,
    pub detail: serde_json::Value,
    pub prev_hash: Option<String>,
    pub hash: String,
    pub created_at: String,
}

/// Events for one consultation plus whether the chain verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub events: Vec<AuditEvent>,
    pub verified: bool,
    /// First problem found, if any
    pub problem: Option<String>,
}

impl AuditTrail {
    pub fn from_events(events: Vec<AuditEvent>) -> Self {
        match verify_chain(&events) {
            Ok(()) => Self {
                events,
                verified: true,
                problem: None,
            },
            Err(e) => Self {
                events,
                verified: false,
                problem: Some(e.to_string()),
            },
        }
    }
}

/// Hash arbitrary data with SHA-256, hex encoded.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hash of one event, chained to its predecessor.
pub fn event_hash(
    prev_hash: Option<&str>,
    consultation_id: &str,
    seq: i64,
    kind: EventKind,
    detail_json: &str,
    created_at: &str,
) -> String {
    let seq = seq.to_string();
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or("").as_bytes());
    for part in [consultation_id, seq.as_str(), kind.as_str(), detail_json, created_at] {
        hasher.update(b"\x1f");
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Recompute every hash in an ordered chain.
pub fn verify_chain(events: &[AuditEvent]) -> AuditResult<()> {
    let mut prev: Option<&str> = None;
    for (i, event) in events.iter().enumerate() {
        let expected_seq = i as i64 + 1;
        if event.seq != expected_seq {
            return Err(AuditError::BrokenChain {
                seq: event.seq,
                reason: format!("expected seq {}", expected_seq),
            });
        }
        if event.prev_hash.as_deref() != prev {
            return Err(AuditError::BrokenChain {
                seq: event.seq,
                reason: "previous hash mismatch".into(),
            });
        }
        let detail_json = serde_json::to_string(&event.detail).map_err(|e| {
            AuditError::BrokenChain {
                seq: event.seq,
                reason: e.to_string(),
            }
        })?;
        let recomputed = event_hash(
            prev,
            &event.consultation_id,
            event.seq,
            event.kind,
            &detail_json,
            &event.created_at,
        );
        if recomputed != event.hash {
            return Err(AuditError::BrokenChain {
                seq: event.seq,
                reason: "content hash mismatch".into(),
            });
        }
        prev = Some(event.hash.as_str());
    }
    Ok(())
}
