//! Embed events and the control surface over the rendered player.
//!
//! The host page owns the iframe and the window message listener. It forwards
//! what it sees as `EmbedEvent`s and gives the session an `EmbedControl` so
//! the gate can stop playback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control over the rendered embed.
pub trait EmbedControl: Send {
    /// Replace the embed's source so it can no longer emit audio or video.
    ///
    /// Called exactly once, at the gated transition.
    fn clear_source(&mut self);
}

/// Invoked once when the preview budget is exhausted; renders the locked UI.
pub type LockCallback = Box<dyn FnOnce() + Send + 'static>;

/// One cross-origin message received by the host page's listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedMessage {
    /// `MessageEvent.origin`, compared exactly against the adapter's origin.
    pub origin: String,
    /// Parsed `MessageEvent.data`.
    pub data: Value,
}

impl EmbedMessage {
    #[must_use]
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// What the host page observed on the embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedEvent {
    /// The iframe's load/ready event. May repeat on reload.
    Loaded,
    /// A postMessage payload.
    Message(EmbedMessage),
    /// The embed's script API failed to initialise.
    ScriptFailed { reason: String },
}
