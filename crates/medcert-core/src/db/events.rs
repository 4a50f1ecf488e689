//! Consultation event chain storage.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::audit::{event_hash, AuditEvent, EventKind};

/// Append an event to a consultation's chain, linking it to the previous
/// event's hash. Runs on whatever connection or transaction is passed in.
pub(crate) fn append_event(
    conn: &Connection,
    consultation_id: &str,
    kind: EventKind,
    detail: &serde_json::Value,
) -> DbResult<AuditEvent> {
    let last: Option<(i64, String)> = conn
        .query_row(
            r#"
            SELECT seq, hash FROM consultation_events
            WHERE consultation_id = ?
            ORDER BY seq DESC LIMIT 1
            "#,
            [consultation_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (seq, prev_hash) = match last {
        Some((seq, hash)) => (seq + 1, Some(hash)),
        None => (1, None),
    };
    let detail_json = serde_json::to_string(detail)?;
    let created_at = crate::timestamp_now();
    let hash = event_hash(
        prev_hash.as_deref(),
        consultation_id,
        seq,
        kind,
        &detail_json,
        &created_at,
    );

    conn.execute(
        r#"
        INSERT INTO consultation_events (
            consultation_id, seq, kind, detail, prev_hash, hash, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            consultation_id,
            seq,
            kind.as_str(),
            detail_json,
            prev_hash,
            hash,
            created_at,
        ],
    )?;

    Ok(AuditEvent {
        consultation_id: consultation_id.to_string(),
        seq,
        kind,
        detail: detail.clone(),
        prev_hash,
        hash,
        created_at,
    })
}

impl Database {
    /// Append a standalone event (outside a status change).
    pub fn record_event(
        &self,
        consultation_id: &str,
        kind: EventKind,
        detail: &serde_json::Value,
    ) -> DbResult<AuditEvent> {
        append_event(&self.conn, consultation_id, kind, detail)
    }

    /// All events for a consultation, oldest first.
    pub fn list_events(&self, consultation_id: &str) -> DbResult<Vec<AuditEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT consultation_id, seq, kind, detail, prev_hash, hash, created_at
            FROM consultation_events
            WHERE consultation_id = ?
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([consultation_id], |row| {
            Ok(EventRow {
                consultation_id: row.get(0)?,
                seq: row.get(1)?,
                kind: row.get(2)?,
                detail: row.get(3)?,
                prev_hash: row.get(4)?,
                hash: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.try_into()?);
        }
        Ok(events)
    }
}

/// Intermediate row struct for database mapping.
struct EventRow {
    consultation_id: String,
    seq: i64,
    kind: String,
    detail: String,
    prev_hash: Option<String>,
    hash: String,
    created_at: String,
}

impl TryFrom<EventRow> for AuditEvent {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = EventKind::parse(&row.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown event kind: {}", row.kind)))?;
        Ok(AuditEvent {
            consultation_id: row.consultation_id,
            seq: row.seq,
            kind,
            detail: serde_json::from_str(&row.detail)?,
            prev_hash: row.prev_hash,
            hash: row.hash,
            created_at: row.created_at,
        })
    }
}
