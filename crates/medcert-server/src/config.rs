//! Server configuration read from `MEDCERT_*` environment variables.

use std::net::SocketAddr;

use medcert_core::{Practitioner, ServiceSettings};
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_FILTER: &str = "medcert_core=info,medcert_server=info";

/// Path value that selects a throwaway in-memory store.
pub const IN_MEMORY: &str = ":memory:";
pub const DEFAULT_DATABASE_PATH: &str = IN_MEMORY;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub staff_password: String,
    pub log_filter: String,
    pub settings: ServiceSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = get("MEDCERT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "MEDCERT_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let staff_password =
            get("MEDCERT_STAFF_PASSWORD").ok_or(ConfigError::Missing("MEDCERT_STAFF_PASSWORD"))?;

        let mut settings = ServiceSettings::default();
        if let Some(name) = get("MEDCERT_PRACTITIONER_NAME") {
            settings.practitioner.name = name;
        }
        if let Some(registration) = get("MEDCERT_PRACTITIONER_REGISTRATION") {
            settings.practitioner.registration_number = registration;
        }
        if let Some(raw) = get("MEDCERT_UTC_OFFSET_HOURS") {
            settings.utc_offset_hours = parse_offset(&raw)?;
        }

        Ok(Self {
            bind_addr,
            database_path: get("MEDCERT_DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            staff_password,
            log_filter: get("MEDCERT_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            settings,
        })
    }

    pub fn practitioner(&self) -> &Practitioner {
        &self.settings.practitioner
    }

    pub fn in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }
}

fn parse_offset(raw: &str) -> Result<i32, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "MEDCERT_UTC_OFFSET_HOURS",
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let hours: i32 = raw.trim().parse().map_err(|_| invalid("not a whole number"))?;
    if !(-12..=14).contains(&hours) {
        return Err(invalid("must be between -12 and 14"));
    }
    Ok(hours)
}
