//! Message types for the session actor.
//!
//! The host page talks to a session only through its handle; every request is
//! a `SessionMessage` on the session's bounded `tokio::sync::mpsc` mailbox.
//! Queries answer over `tokio::sync::oneshot`.

use crate::embed::EmbedEvent;
use crate::gate::{GateState, PlaybackSnapshot};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;

/// Messages sent to `PreviewSessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Something the host page observed on the embed.
    Embed(EmbedEvent),

    /// Read the current clock for a progress bar.
    GetSnapshot {
        /// Response channel for the snapshot.
        respond_to: oneshot::Sender<PlaybackSnapshot>,
    },
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// Zero budget; the player was never playable.
    LockedAtMount,
    /// The budget ran out during playback.
    Gated,
    /// The host tore the player down.
    Unmounted,
    /// Every handle was dropped without an explicit unmount.
    Detached,
}

impl SessionEnd {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::LockedAtMount => "locked_at_mount",
            SessionEnd::Gated => "gated",
            SessionEnd::Unmounted => "unmounted",
            SessionEnd::Detached => "detached",
        }
    }
}

/// Returned by the session task when it exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub final_state: GateState,
    /// Playing time accounted when the session stopped.
    pub elapsed: Duration,
    /// Embed events handled, including dropped ones.
    pub events_processed: u64,
    /// Events dropped for origin mismatch or decode failure.
    pub events_dropped: u64,
}
