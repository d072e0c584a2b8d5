//! Preview sessions.
//!
//! A session is one mounted player. [`PreviewSession::mount`] runs the
//! mount-time lock check, attaches the adapter for the embed kind and spawns
//! the session actor. The host page keeps the returned
//! [`PreviewSessionHandle`] and forwards what it observes on the embed.
//!
//! # Lifecycle
//!
//! 1. `mount` checks the policy; a zero budget gates before any adapter exists
//! 2. The actor runs until the gate fires, `unmount` is called, or every
//!    handle is dropped
//! 3. The task resolves to a [`SessionSummary`]
//!
//! Unmounting cancels the actor synchronously. The gate controller shares the
//! cancellation token and will not clear the embed or lock the player once it
//! is cancelled; the lock callback is also wrapped to re-check it.

mod actor;
pub(crate) mod driver;
pub mod messages;

pub use messages::{SessionEnd, SessionMessage, SessionSummary};

use crate::adapters;
use crate::budget::Selection;
use crate::config::Config;
use crate::embed::{EmbedControl, EmbedEvent, EmbedMessage, LockCallback};
use crate::errors::PreviewError;
use crate::gate::{GateController, Outcome, PlaybackSnapshot};
use crate::observability::metrics;
use crate::policy::{PreviewBudget, PreviewPolicy};
use crate::types::{MediaId, MediaKind, SessionId};
use actor::PreviewSessionActor;
use driver::SessionDriver;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Inputs fixed at mount time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub media_id: MediaId,
    pub kind: MediaKind,
    pub entitled: bool,
    pub budget: PreviewBudget,
}

impl SessionParams {
    #[must_use]
    pub fn new(media_id: MediaId, kind: MediaKind, entitled: bool, budget: PreviewBudget) -> Self {
        Self {
            media_id,
            kind,
            entitled,
            budget,
        }
    }

    /// Parameters from a [`PreviewBudgetSelector`](crate::budget::PreviewBudgetSelector) lookup.
    #[must_use]
    pub fn from_selection(media_id: MediaId, kind: MediaKind, selection: Selection) -> Self {
        Self::new(media_id, kind, selection.entitled, selection.budget)
    }

    #[must_use]
    pub fn policy(&self) -> PreviewPolicy {
        PreviewPolicy::new(self.budget, self.entitled)
    }
}

/// Entry point for mounting preview sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewSession;

impl PreviewSession {
    /// Mount a session for one rendered player.
    ///
    /// Must be called from within a Tokio runtime. Returns the handle and the
    /// task that resolves when the session stops.
    pub fn mount(
        params: SessionParams,
        config: &Config,
        embed: Box<dyn EmbedControl>,
        on_preview_end: LockCallback,
    ) -> (PreviewSessionHandle, JoinHandle<SessionSummary>) {
        let session_id = SessionId::new();
        let cancel_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(config.session_mailbox);

        let handle = PreviewSessionHandle {
            sender,
            cancel_token: cancel_token.clone(),
            session_id,
            media_id: params.media_id.clone(),
            kind: params.kind,
        };

        let callback_token = cancel_token.clone();
        let guarded_callback: LockCallback = Box::new(move || {
            if !callback_token.is_cancelled() {
                on_preview_end();
            }
        });

        let policy = params.policy();
        let mut gate = GateController::new(policy, embed, guarded_callback)
            .with_cancel_token(cancel_token.clone());

        metrics::record_session_mounted(params.kind.as_str());
        info!(
            target: "preview.session",
            session_id = %session_id,
            media_id = %params.media_id,
            kind = params.kind.as_str(),
            entitled = params.entitled,
            budget_secs = params.budget.limit().map(|l| l.as_secs()),
            "Preview session mounted"
        );

        if let Outcome::Gated(cause) = gate.mount(Instant::now()) {
            metrics::record_gate_fired(params.kind.as_str(), cause.as_str());
            metrics::record_session_ended(params.kind.as_str(), SessionEnd::LockedAtMount.as_str());
            info!(
                target: "preview.session",
                session_id = %session_id,
                "Zero preview budget, player locked at mount"
            );

            // No adapter, timer or listener is ever attached
            drop(receiver);
            let summary = SessionSummary {
                end: SessionEnd::LockedAtMount,
                final_state: gate.state(),
                elapsed: gate.elapsed(Instant::now()),
                events_processed: 0,
                events_dropped: 0,
            };
            return (handle, tokio::spawn(async move { summary }));
        }

        let adapter = adapters::attach(params.kind, config);
        let actor = PreviewSessionActor::new(
            session_id,
            params.media_id,
            params.kind,
            SessionDriver::new(gate, adapter),
            receiver,
            cancel_token,
            config.fallback_tick,
        );
        let task = tokio::spawn(actor.run());

        (handle, task)
    }
}

/// Handle to a mounted session.
///
/// Cheap to clone; the session detaches once every clone is dropped.
#[derive(Clone, Debug)]
pub struct PreviewSessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    session_id: SessionId,
    media_id: MediaId,
    kind: MediaKind,
}

impl PreviewSessionHandle {
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn media_id(&self) -> &MediaId {
        &self.media_id
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Forward an embed event.
    pub async fn send_event(&self, event: EmbedEvent) -> Result<(), PreviewError> {
        if self.cancel_token.is_cancelled() {
            return Err(PreviewError::SessionClosed);
        }
        self.sender
            .send(SessionMessage::Embed(event))
            .await
            .map_err(|_| PreviewError::SessionClosed)
    }

    /// The iframe fired its load event.
    pub async fn embed_loaded(&self) -> Result<(), PreviewError> {
        self.send_event(EmbedEvent::Loaded).await
    }

    /// Forward a cross-origin message as received by the page's listener.
    pub async fn deliver(&self, origin: impl Into<String>, data: Value) -> Result<(), PreviewError> {
        self.send_event(EmbedEvent::Message(EmbedMessage::new(origin, data)))
            .await
    }

    /// The embed's script API failed to initialise.
    pub async fn script_failed(&self, reason: impl Into<String>) -> Result<(), PreviewError> {
        self.send_event(EmbedEvent::ScriptFailed {
            reason: reason.into(),
        })
        .await
    }

    /// Current elapsed playing time and remaining budget.
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, PreviewError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|_| PreviewError::SessionClosed)?;

        rx.await.map_err(|_| PreviewError::SessionClosed)
    }

    /// Tear the session down. Takes effect immediately: no lock callback can
    /// run after this returns.
    pub fn unmount(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
