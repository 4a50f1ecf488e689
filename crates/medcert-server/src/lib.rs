//! HTTP surface for medcert.
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌────────────────────────────┐
//! │ axum Router  │──▶│ staff guard    │──▶│ endpoints (spawn_blocking) │
//! │ + TraceLayer │   │ (bearer token) │   │ → ConsultationService      │
//! └──────────────┘   └────────────────┘   └────────────────────────────┘
//! ```
//!
//! Handlers never hold a database lock across an `.await`; each service
//! call runs to completion on a blocking worker.

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod router;
pub mod state;

pub use config::{ConfigError, ServerConfig, IN_MEMORY};
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

use std::sync::Arc;

use medcert_core::db::Database;
use medcert_core::payment::MockPaymentProvider;
use medcert_core::settlement::LoggingMailer;
use medcert_core::{ConsultationService, DbError, TextCertificateGenerator};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StartupError {
    /// The in-process provider forgets its holds on restart.
    #[error("database {0:?} outlives the in-process payment provider; use \":memory:\"")]
    PersistentStoreWithoutProvider(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Wire the core service from configuration.
pub fn build_service(config: &ServerConfig) -> Result<ConsultationService, StartupError> {
    // No card processor is wired in; holds live in process.
    if !config.in_memory() {
        return Err(StartupError::PersistentStoreWithoutProvider(
            config.database_path.clone(),
        ));
    }
    warn!("Using the in-process payment provider and an in-memory database; records are lost on restart");

    Ok(ConsultationService::new(
        Database::open_in_memory()?,
        Arc::new(MockPaymentProvider::new()),
        Arc::new(TextCertificateGenerator::new()),
        Arc::new(LoggingMailer),
        config.settings.clone(),
    ))
}
