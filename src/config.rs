use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::Database;

pub const DEFAULT_MODEL: &str = "claude-sonnet";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub model: String,
    pub timeout: Duration,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_secs = match lookup("CAREEROS_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("CAREEROS_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            db_path: lookup("CAREEROS_DB")
                .map(PathBuf::from)
                .unwrap_or_else(Database::default_path),
            model: lookup("CAREEROS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            log_filter: lookup("CAREEROS_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}
