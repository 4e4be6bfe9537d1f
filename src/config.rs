// ⚙️ Configuration - environment-driven settings shared by CLI, kiosk and server
//
// Every key is optional; missing keys fall back to the defaults below and are
// logged. A value that is present but unparsable is an error, never a silent
// default.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub const DB_KEY: &str = "CHECKIN_DB";
pub const ADDR_KEY: &str = "CHECKIN_ADDR";
pub const STORE_TIMEOUT_KEY: &str = "CHECKIN_STORE_TIMEOUT_MS";
pub const RECENT_LIMIT_KEY: &str = "CHECKIN_RECENT_LIMIT";
pub const ENFORCE_UNIQUE_KEY: &str = "CHECKIN_ENFORCE_UNIQUE";

const DEFAULT_DB: &str = "attendance.db";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STORE_TIMEOUT_MS: &str = "10000";
const DEFAULT_RECENT_LIMIT: &str = "50";
const DEFAULT_ENFORCE_UNIQUE: &str = "false";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Bound on each store call; `None` waits indefinitely
    pub store_timeout: Option<Duration>,
    pub recent_limit: usize,
    /// Create unique indexes on names and (name, day)
    pub enforce_unique: bool,
}

impl Default for Config {
    fn default() -> Self {
        // Defaults are constants known to parse
        Config::from_lookup(|_| None).unwrap_or_else(|_| Config {
            database_path: PathBuf::from(DEFAULT_DB),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_timeout: Some(Duration::from_millis(10_000)),
            recent_limit: 50,
            enforce_unique: false,
        })
    }
}

impl Config {
    /// Read settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, so tests need not touch the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = PathBuf::from(value_or_default(&lookup, DB_KEY, DEFAULT_DB));
        let bind_addr = parse_key(&lookup, ADDR_KEY, DEFAULT_ADDR)?;

        let timeout_ms: u64 = parse_key(&lookup, STORE_TIMEOUT_KEY, DEFAULT_STORE_TIMEOUT_MS)?;
        let store_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let recent_limit = parse_key(&lookup, RECENT_LIMIT_KEY, DEFAULT_RECENT_LIMIT)?;

        let raw_unique = value_or_default(&lookup, ENFORCE_UNIQUE_KEY, DEFAULT_ENFORCE_UNIQUE);
        let enforce_unique = parse_flag(&raw_unique).ok_or_else(|| ConfigError::Invalid {
            key: ENFORCE_UNIQUE_KEY,
            value: raw_unique.clone(),
            reason: "expected true/false, 1/0, yes/no".to_string(),
        })?;

        Ok(Config {
            database_path,
            bind_addr,
            store_timeout,
            recent_limit,
            enforce_unique,
        })
    }
}

fn value_or_default<F>(lookup: &F, key: &'static str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value,
        None => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

fn parse_key<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value_or_default(lookup, key, default);
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
