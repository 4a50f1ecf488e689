//! SQLite schema definition.

/// Complete database schema for medcert.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Consultations (never deleted)
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultations (
    id TEXT PRIMARY KEY,
    leave_type TEXT NOT NULL CHECK (leave_type IN ('personal', 'carer')),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,                 -- YYYY-MM-DD
    symptoms TEXT NOT NULL DEFAULT '[]',         -- JSON array of symptom tags
    symptom_details TEXT,
    symptom_start_date TEXT NOT NULL,            -- YYYY-MM-DD
    days_requested INTEGER NOT NULL CHECK (days_requested IN (1, 2)),
    care_recipient_name TEXT,
    care_relationship TEXT,
    preferred_call_time TEXT NOT NULL,           -- YYYY-MM-DD HH:MM:SS
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'scheduled', 'in_progress', 'completed', 'declined')),
    payment_status TEXT NOT NULL DEFAULT 'authorized'
        CHECK (payment_status IN ('authorized', 'captured', 'voided')),
    payment_intent_id TEXT NOT NULL UNIQUE,
    amount_cents INTEGER NOT NULL,
    pharmacist_notes TEXT,
    call_notes TEXT,
    decline_reason TEXT,
    days_to_issue INTEGER NOT NULL CHECK (days_to_issue IN (1, 2)),
    reconciliation_note TEXT,
    settlement_claim TEXT CHECK (settlement_claim IN ('issuing', 'declining')),
    settlement_claimed_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((leave_type = 'carer') = (care_recipient_name IS NOT NULL AND care_relationship IS NOT NULL)),
    CHECK ((status = 'declined') = (payment_status = 'voided')),
    CHECK (status <> 'declined' OR decline_reason IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_consultations_status ON consultations(status);
CREATE INDEX IF NOT EXISTS idx_consultations_dob ON consultations(date_of_birth);
CREATE INDEX IF NOT EXISTS idx_consultations_created ON consultations(created_at);

CREATE TRIGGER IF NOT EXISTS consultations_no_delete BEFORE DELETE ON consultations
BEGIN
    SELECT RAISE(ABORT, 'Consultations are retained as an audit trail');
END;

-- ============================================================================
-- Certificates (one per completed consultation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS certificates (
    id TEXT PRIMARY KEY,
    consultation_id TEXT NOT NULL UNIQUE REFERENCES consultations(id),
    verification_code TEXT NOT NULL UNIQUE,
    patient_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    leave_type TEXT NOT NULL,
    care_recipient_name TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    practitioner_name TEXT NOT NULL,
    practitioner_registration TEXT NOT NULL,
    document TEXT NOT NULL,
    issued_at TEXT NOT NULL
);

-- ============================================================================
-- Consultation events (append-only hash chain)
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultation_events (
    consultation_id TEXT NOT NULL REFERENCES consultations(id),
    seq INTEGER NOT NULL,
    kind TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT '{}',           -- JSON object
    prev_hash TEXT,                              -- NULL for the first event
    hash TEXT NOT NULL UNIQUE,                   -- SHA-256 over prev_hash and content
    created_at TEXT NOT NULL,
    PRIMARY KEY (consultation_id, seq)
);

CREATE TRIGGER IF NOT EXISTS consultation_events_no_update BEFORE UPDATE ON consultation_events
BEGIN
    SELECT RAISE(ABORT, 'Consultation events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS consultation_events_no_delete BEFORE DELETE ON consultation_events
BEGIN
    SELECT RAISE(ABORT, 'Consultation events are append-only');
END;
"#;
