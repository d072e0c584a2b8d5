//! Time-explicit session logic shared by the actor and the replay driver.
//!
//! `SessionDriver` routes embed events through the adapter into the gate
//! controller. It never reads the clock itself; callers pass `now`, which is
//! wall time in the actor and virtual time in the replay runner.

use super::messages::{SessionEnd, SessionSummary};
use crate::adapters::{EventSource, Signal, TrackingMode};
use crate::embed::{EmbedEvent, EmbedMessage};
use crate::errors::AdapterError;
use crate::gate::{GateController, GateState, Outcome};
use crate::observability::metrics;
use crate::types::MediaKind;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) struct SessionDriver {
    kind: MediaKind,
    gate: GateController,
    adapter: Box<dyn EventSource>,
    /// Armed at load for adapters that must report ready.
    ready_deadline: Option<(Instant, Duration)>,
    events_processed: u64,
    events_dropped: u64,
}

impl SessionDriver {
    pub(crate) fn new(gate: GateController, adapter: Box<dyn EventSource>) -> Self {
        Self {
            kind: adapter.kind(),
            gate,
            adapter,
            ready_deadline: None,
            events_processed: 0,
            events_dropped: 0,
        }
    }

    pub(crate) fn gate(&self) -> &GateController {
        &self.gate
    }

    pub(crate) fn mode(&self) -> TrackingMode {
        self.adapter.mode()
    }

    pub(crate) fn ready_deadline(&self) -> Option<Instant> {
        self.ready_deadline.map(|(at, _)| at)
    }

    pub(crate) fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub(crate) fn events_dropped(&self) -> u64 {
        self.events_dropped
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.gate.state().is_terminal()
    }

    /// How the session ended, once the gate reached a terminal state.
    pub(crate) fn terminal_end(&self) -> Option<SessionEnd> {
        match self.gate.state() {
            GateState::Gated => Some(SessionEnd::Gated),
            GateState::Unmounted => Some(SessionEnd::Unmounted),
            _ => None,
        }
    }

    pub(crate) fn handle_embed(&mut self, event: EmbedEvent, now: Instant) {
        self.events_processed += 1;
        if self.is_finished() {
            self.drop_event("stale");
            return;
        }

        match event {
            EmbedEvent::Loaded => {
                if let Some(signal) = self.adapter.on_loaded() {
                    self.apply(signal, now);
                }
                if self.ready_deadline.is_none() {
                    if let Some(timeout) = self.adapter.ready_timeout() {
                        self.ready_deadline = Some((now + timeout, timeout));
                    }
                }
            }
            EmbedEvent::Message(message) => self.handle_message(&message, now),
            EmbedEvent::ScriptFailed { reason } => {
                self.fail_over(AdapterError::ScriptUnavailable(reason), now);
            }
        }
    }

    /// Count an event that arrived after teardown began.
    pub(crate) fn reject_stale(&mut self) {
        self.events_processed += 1;
        self.drop_event("stale");
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        let outcome = self.gate.tick(now);
        self.observe(outcome);
    }

    /// The adapter missed its ready deadline.
    pub(crate) fn expire_ready_deadline(&mut self, now: Instant) {
        if let Some((_, timeout)) = self.ready_deadline.take() {
            self.fail_over(AdapterError::ReadyTimeout(timeout), now);
        }
    }

    /// Stop the session and report how it ended.
    pub(crate) fn finish(&mut self, end: SessionEnd, now: Instant) -> SessionSummary {
        if !self.is_finished() {
            self.gate.unmount(now);
        }
        self.ready_deadline = None;
        metrics::record_session_ended(self.kind.as_str(), end.as_str());

        SessionSummary {
            end,
            final_state: self.gate.state(),
            elapsed: self.gate.elapsed(now),
            events_processed: self.events_processed,
            events_dropped: self.events_dropped,
        }
    }

    fn handle_message(&mut self, message: &EmbedMessage, now: Instant) {
        if !self.adapter.accepts_origin(&message.origin) {
            debug!(
                target: "preview.session",
                origin = %message.origin,
                expected = self.adapter.expected_origin(),
                "Dropping message from untrusted origin"
            );
            self.drop_event("untrusted_origin");
            return;
        }

        match self.adapter.translate(&message.data) {
            Ok(Some(signal)) => self.apply(signal, now),
            Ok(None) => {}
            Err(e) => {
                debug!(target: "preview.session", error = %e, "Dropping malformed message");
                self.drop_event(e.label());
            }
        }

        if self.adapter.is_ready() {
            self.ready_deadline = None;
        }
    }

    fn fail_over(&mut self, error: AdapterError, now: Instant) {
        let before = self.adapter.mode();
        let signal = self.adapter.on_script_failed(&error);

        if before == TrackingMode::Authoritative && self.adapter.mode() == TrackingMode::FallbackOnly
        {
            warn!(
                target: "preview.session",
                error = %error,
                "Adapter degraded to timer-only tracking"
            );
            metrics::record_adapter_fallback(self.kind.as_str(), error.label());
        }
        self.ready_deadline = None;

        if let Some(signal) = signal {
            self.apply(signal, now);
        }
    }

    fn apply(&mut self, signal: Signal, now: Instant) {
        let outcome = self.gate.apply(signal, now);
        self.observe(outcome);
    }

    fn observe(&self, outcome: Outcome) {
        if let Outcome::Gated(cause) = outcome {
            metrics::record_gate_fired(self.kind.as_str(), cause.as_str());
        }
    }

    fn drop_event(&mut self, reason: &str) {
        self.events_dropped += 1;
        metrics::record_signal_dropped(self.kind.as_str(), reason);
    }
}
