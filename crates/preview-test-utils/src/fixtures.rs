//! Embed payload fixtures and a mounted-session harness.

use crate::mock_embed::{LockSpy, RecordingEmbed};
use preview_gate::config::{
    Config, DEFAULT_AUDIO_ORIGIN, DEFAULT_STREAM_ORIGIN, DEFAULT_YOUTUBE_ORIGIN,
};
use preview_gate::policy::PreviewBudget;
use preview_gate::session::{PreviewSession, PreviewSessionHandle, SessionParams, SessionSummary};
use preview_gate::types::{MediaId, MediaKind};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub const YOUTUBE_ORIGIN: &str = DEFAULT_YOUTUBE_ORIGIN;
pub const STREAM_ORIGIN: &str = DEFAULT_STREAM_ORIGIN;
pub const AUDIO_ORIGIN: &str = DEFAULT_AUDIO_ORIGIN;

/// Stream `currentTime` property change, in seconds.
#[must_use]
pub fn stream_current_time(seconds: f64) -> Value {
    json!({
        "__privateUnstableMessageType": "propertyChange",
        "property": "currentTime",
        "value": seconds
    })
}

/// Stream lifecycle event (`play`, `pause`, `waiting`, ...).
#[must_use]
pub fn stream_event(name: &str) -> Value {
    json!({"__privateUnstableMessageType": "event", "eventName": name})
}

/// Audio widget message without a payload (`ready`, `play`, `pause`, `finish`).
#[must_use]
pub fn audio_method(method: &str) -> Value {
    json!({"widgetId": "widget_test", "method": method})
}

/// Audio widget `playProgress`, position in milliseconds.
#[must_use]
pub fn audio_progress_ms(position_ms: f64) -> Value {
    json!({
        "widgetId": "widget_test",
        "method": "playProgress",
        "value": {
            "currentPosition": position_ms,
            "relativePosition": 0.0,
            "loadedProgress": 1.0
        }
    })
}

/// Non-entitled session parameters with a budget in seconds.
#[must_use]
pub fn preview_params(kind: MediaKind, budget_secs: Option<u32>) -> SessionParams {
    SessionParams::new(
        MediaId::new(format!("test-{}", kind.as_str())),
        kind,
        false,
        PreviewBudget::from_seconds(budget_secs),
    )
}

/// A mounted session wired to a `RecordingEmbed` and a `LockSpy`.
pub struct TestSession {
    pub handle: PreviewSessionHandle,
    pub task: JoinHandle<SessionSummary>,
    pub embed: RecordingEmbed,
    pub spy: LockSpy,
}

impl TestSession {
    /// Mount with default configuration. Requires a Tokio runtime.
    #[must_use]
    pub fn mount(kind: MediaKind, budget_secs: Option<u32>) -> Self {
        Self::mount_with(preview_params(kind, budget_secs), &Config::default())
    }

    #[must_use]
    pub fn mount_with(params: SessionParams, config: &Config) -> Self {
        let embed = RecordingEmbed::new();
        let spy = LockSpy::new();
        let (handle, task) = PreviewSession::mount(params, config, embed.boxed(), spy.callback());

        Self {
            handle,
            task,
            embed,
            spy,
        }
    }

    /// Wait for the session task to finish.
    ///
    /// # Panics
    ///
    /// Panics if the session task panicked.
    pub async fn finish(self) -> (SessionSummary, RecordingEmbed, LockSpy) {
        let summary = self.task.await.expect("session task panicked");
        (summary, self.embed, self.spy)
    }

    /// # Panics
    ///
    /// Panics unless the player was locked exactly once.
    pub fn assert_locked_once(&self) {
        assert_eq!(self.spy.count(), 1, "lock callback count");
        assert_eq!(self.embed.clear_count(), 1, "clear_source count");
    }

    /// # Panics
    ///
    /// Panics if the player was ever locked.
    pub fn assert_never_locked(&self) {
        assert_eq!(self.spy.count(), 0, "lock callback count");
        assert!(!self.embed.was_cleared(), "embed source was cleared");
    }
}
