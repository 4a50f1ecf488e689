//! Database layer for medcert.

mod certificates;
mod consultations;
mod events;
mod schema;

pub use consultations::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database lock poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DbError::Poisoned(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn parse_date(field: &str, raw: &str) -> DbResult<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| DbError::Constraint(format!("Invalid {}: {}", field, raw)))
}

pub(crate) fn parse_datetime(field: &str, raw: &str) -> DbResult<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .map_err(|_| DbError::Constraint(format!("Invalid {}: {}", field, raw)))
}
