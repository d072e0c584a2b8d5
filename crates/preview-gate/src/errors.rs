//! Preview gate error types.
//!
//! None of these are user-visible. The only states a viewer ever sees are
//! "still previewing" and "locked"; every failure below degrades to a coarser
//! estimate or is dropped.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the session handle.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The session has gated, unmounted, or its actor exited.
    ///
    /// Callers delivering embed events may ignore this: a signal arriving
    /// after teardown is stale by definition.
    #[error("Preview session closed")]
    SessionClosed,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Adapter-level failures. All are recovered locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// The embed's script API failed to initialise (blocked, load-order race).
    #[error("Embed script unavailable: {0}")]
    ScriptUnavailable(String),

    /// The embed never reported ready after it loaded.
    #[error("Embed not ready after {0:?}")]
    ReadyTimeout(Duration),

    /// A payload from the trusted origin that could not be decoded.
    #[error("Malformed embed message: {0}")]
    MalformedMessage(String),
}

impl AdapterError {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            AdapterError::ScriptUnavailable(_) => "script_unavailable",
            AdapterError::ReadyTimeout(_) => "ready_timeout",
            AdapterError::MalformedMessage(_) => "malformed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", PreviewError::SessionClosed),
            "Preview session closed"
        );
        assert_eq!(
            format!(
                "{}",
                AdapterError::ScriptUnavailable("blocked by extension".to_string())
            ),
            "Embed script unavailable: blocked by extension"
        );
        assert_eq!(
            format!("{}", AdapterError::ReadyTimeout(Duration::from_secs(5))),
            "Embed not ready after 5s"
        );
    }

    #[test]
    fn test_labels_are_bounded() {
        assert_eq!(
            AdapterError::ScriptUnavailable(String::new()).label(),
            "script_unavailable"
        );
        assert_eq!(
            AdapterError::ReadyTimeout(Duration::ZERO).label(),
            "ready_timeout"
        );
        assert_eq!(
            AdapterError::MalformedMessage(String::new()).label(),
            "malformed"
        );
    }
}
