//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable values fall back to
//! defaults; only an unparsable listen address is an error.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::service::{PublishLimits, SessionOptions};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-field lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Directory served as static files for unmatched routes.
    pub static_dir: Option<PathBuf>,

    /// Frames queued per connection before sends start waiting.
    pub outbound_buffer: usize,

    /// How long a send may wait for queue space before the recipient is
    /// considered failed.
    pub send_timeout: Duration,

    /// Idle period after which a silent client is dropped.
    pub activity_timeout: Duration,

    /// Largest accepted publish payload in bytes.
    pub max_payload_bytes: usize,

    /// Push `subscription_count` events on membership change.
    pub membership_notifications: bool,

    /// Upper bound for HTTP request handling.
    pub request_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: None,
            outbound_buffer: 256,
            send_timeout: Duration::from_millis(5_000),
            activity_timeout: Duration::from_secs(120),
            max_payload_bytes: 10_240,
            membership_notifications: true,
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Pretty,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as a
    /// [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `LISTEN_ADDR` wins over `PORT`; `PORT` alone binds `0.0.0.0:$PORT`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let listen_addr = match (lookup("LISTEN_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr
                .parse()
                .with_context(|| format!("invalid LISTEN_ADDR {addr:?}"))?,
            (None, Some(port)) => match port.parse::<u16>() {
                Ok(port) => SocketAddr::from(([0, 0, 0, 0], port)),
                Err(_) => defaults.listen_addr,
            },
            (None, None) => defaults.listen_addr,
        };

        let static_dir = lookup("STATIC_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => defaults.log_format,
        };

        Ok(Self {
            listen_addr,
            static_dir,
            outbound_buffer: parse(&lookup, "OUTBOUND_BUFFER", defaults.outbound_buffer).max(1),
            send_timeout: Duration::from_millis(parse(&lookup, "SEND_TIMEOUT_MS", 5_000)),
            activity_timeout: Duration::from_secs(parse(&lookup, "ACTIVITY_TIMEOUT_SECS", 120)),
            max_payload_bytes: parse(&lookup, "MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
            membership_notifications: parse_bool(
                &lookup,
                "MEMBERSHIP_NOTIFICATIONS",
                defaults.membership_notifications,
            ),
            request_timeout: Duration::from_secs(parse(&lookup, "REQUEST_TIMEOUT_SECS", 30)),
            log_format,
        })
    }

    /// Session tunables derived from this configuration.
    #[must_use]
    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            membership_notifications: self.membership_notifications,
            activity_timeout: self.activity_timeout,
        }
    }

    /// Publish limits derived from this configuration.
    #[must_use]
    pub const fn publish_limits(&self) -> PublishLimits {
        PublishLimits {
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}

/// Parses a value as `T`, returning `default` on missing or invalid input.
fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
