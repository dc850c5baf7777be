use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const APP_NAME: &str = "medication_reminders";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DB_PATH: &str = "data/db.json";
pub const DEFAULT_TICK_SECS: u64 = 60;

pub fn default_log_filter() -> &'static str {
    "medication_reminders=info,tower_http=info"
}

/// Process-level settings read once at startup.
///
/// Reminder behaviour (due window, snooze length) is stored with the data instead,
/// so it can be changed through `/api/settings` without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub tick: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Invalid values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr: SocketAddr = ([127, 0, 0, 1], 3000).into();

        let addr = match lookup("REMINDERS_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid REMINDERS_ADDR, using {DEFAULT_ADDR}");
                default_addr
            }),
            None => default_addr,
        };

        let db_path = lookup("REMINDERS_DB")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let tick_secs = match lookup("REMINDERS_TICK_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "invalid REMINDERS_TICK_SECS, using {DEFAULT_TICK_SECS}");
                    DEFAULT_TICK_SECS
                }
            },
            None => DEFAULT_TICK_SECS,
        };

        Self {
            addr,
            db_path,
            tick: Duration::from_secs(tick_secs),
        }
    }
}
