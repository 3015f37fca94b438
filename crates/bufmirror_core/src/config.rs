//! Configuration loading from environment variables.

use crate::channel::Backoff;
use crate::constants::{
    DEFAULT_CHANNEL_DIR, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_POLL_MAX_MS, DEFAULT_POLL_STEP_MS,
};
use crate::coords::CoordinatePolicy;
use crate::line_index::IndexMode;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the mirror engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub channel_dir: PathBuf,
    pub poll_step: Duration,
    pub poll_max: Duration,
    pub max_payload_len: usize,
    pub coordinates: CoordinatePolicy,
    pub index_mode: IndexMode,
    pub clear_screen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_dir: PathBuf::from(DEFAULT_CHANNEL_DIR),
            poll_step: Duration::from_millis(DEFAULT_POLL_STEP_MS),
            poll_max: Duration::from_millis(DEFAULT_POLL_MAX_MS),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            coordinates: CoordinatePolicy::default(),
            index_mode: IndexMode::default(),
            clear_screen: true,
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

/// Parse `name` from the environment, falling back to `default` when it is
/// missing or invalid.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Ignoring invalid {}={:?}: {}", name, raw, err);
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Variables
    /// - `BUFMIRROR_CHANNEL_DIR`: directory holding channel files.
    /// - `BUFMIRROR_POLL_STEP_MS` / `BUFMIRROR_POLL_MAX_MS`: idle backoff.
    /// - `BUFMIRROR_MAX_PAYLOAD`: largest accepted payload in bytes.
    /// - `BUFMIRROR_COORDINATES`: `strict` or `clamp`.
    /// - `BUFMIRROR_INDEX`: `incremental` or `rebuild`.
    /// - `BUFMIRROR_NO_CLEAR`: flag, disables screen clearing.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            channel_dir: env::var("BUFMIRROR_CHANNEL_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.channel_dir),
            poll_step: Duration::from_millis(env_parse(
                "BUFMIRROR_POLL_STEP_MS",
                DEFAULT_POLL_STEP_MS,
            )),
            poll_max: Duration::from_millis(env_parse(
                "BUFMIRROR_POLL_MAX_MS",
                DEFAULT_POLL_MAX_MS,
            )),
            max_payload_len: env_parse("BUFMIRROR_MAX_PAYLOAD", defaults.max_payload_len),
            coordinates: env_parse("BUFMIRROR_COORDINATES", defaults.coordinates),
            index_mode: env_parse("BUFMIRROR_INDEX", defaults.index_mode),
            clear_screen: !env_flag_enabled("BUFMIRROR_NO_CLEAR"),
        }
    }

    /// Backoff schedule for idle channel polls.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.poll_step, self.poll_max)
    }
}
