//! Preview gate configuration.
//!
//! Configuration is loaded from environment variables, with defaults that
//! match the embeds' production origins. The host page supplies budgets and
//! entitlement per session; nothing here is per-asset.

use crate::types::MediaKind;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default fallback timer period in milliseconds.
pub const DEFAULT_FALLBACK_TICK_MS: u64 = 1000;

/// Default time the audio widget has to report ready after loading.
pub const DEFAULT_AUDIO_READY_TIMEOUT_MS: u64 = 5000;

/// Default session mailbox capacity.
pub const DEFAULT_SESSION_MAILBOX: usize = 64;

/// Default trusted origin for YouTube iframes.
pub const DEFAULT_YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// Default trusted origin for Stream iframes.
pub const DEFAULT_STREAM_ORIGIN: &str = "https://iframe.videodelivery.net";

/// Default trusted origin for the audio widget.
pub const DEFAULT_AUDIO_ORIGIN: &str = "https://w.soundcloud.com";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fallback timer period (default: 1s).
    pub fallback_tick: Duration,

    /// Deadline for the audio widget's `ready` event after load (default: 5s).
    pub audio_ready_timeout: Duration,

    /// Capacity of each session's mailbox (default: 64).
    pub session_mailbox: usize,

    /// Exact origin trusted for YouTube messages.
    pub youtube_origin: String,

    /// Exact origin trusted for Stream messages.
    pub stream_origin: String,

    /// Exact origin trusted for audio widget messages.
    pub audio_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_tick: Duration::from_millis(DEFAULT_FALLBACK_TICK_MS),
            audio_ready_timeout: Duration::from_millis(DEFAULT_AUDIO_READY_TIMEOUT_MS),
            session_mailbox: DEFAULT_SESSION_MAILBOX,
            youtube_origin: DEFAULT_YOUTUBE_ORIGIN.to_string(),
            stream_origin: DEFAULT_STREAM_ORIGIN.to_string(),
            audio_origin: DEFAULT_AUDIO_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let fallback_tick_ms: u64 =
            parse_var(vars, "PREVIEW_FALLBACK_TICK_MS", DEFAULT_FALLBACK_TICK_MS)?;
        if fallback_tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "PREVIEW_FALLBACK_TICK_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let audio_ready_timeout_ms: u64 = parse_var(
            vars,
            "PREVIEW_AUDIO_READY_TIMEOUT_MS",
            DEFAULT_AUDIO_READY_TIMEOUT_MS,
        )?;

        let session_mailbox: usize =
            parse_var(vars, "PREVIEW_SESSION_MAILBOX", DEFAULT_SESSION_MAILBOX)?;
        if session_mailbox == 0 {
            return Err(ConfigError::InvalidValue {
                name: "PREVIEW_SESSION_MAILBOX".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let youtube_origin = vars
            .get("PREVIEW_YOUTUBE_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_YOUTUBE_ORIGIN.to_string());

        let stream_origin = vars
            .get("PREVIEW_STREAM_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_STREAM_ORIGIN.to_string());

        let audio_origin = vars
            .get("PREVIEW_AUDIO_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUDIO_ORIGIN.to_string());

        Ok(Config {
            fallback_tick: Duration::from_millis(fallback_tick_ms),
            audio_ready_timeout: Duration::from_millis(audio_ready_timeout_ms),
            session_mailbox,
            youtube_origin,
            stream_origin,
            audio_origin,
        })
    }

    /// Trusted origin for the given embed kind.
    #[must_use]
    pub fn origin_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::YouTube => &self.youtube_origin,
            MediaKind::Stream => &self.stream_origin,
            MediaKind::Audio => &self.audio_origin,
        }
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}
