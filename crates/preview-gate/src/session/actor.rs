//! `PreviewSessionActor` - one task per mounted player.
//!
//! The actor wraps a [`SessionDriver`] with wall time and a mailbox. Its inputs
//! are multiplexed with a biased `select!`:
//!
//! 1. cancellation (unmount) always wins
//! 2. embed events from the mailbox
//! 3. the fallback tick
//! 4. the adapter's ready deadline, when one is armed
//!
//! The mailbox, interval and deadline are locals of the task and are released
//! when it returns, whichever way it ends.

use super::driver::SessionDriver;
use super::messages::{SessionEnd, SessionMessage, SessionSummary};
use crate::types::{MediaId, MediaKind, SessionId};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub(super) struct PreviewSessionActor {
    session_id: SessionId,
    media_id: MediaId,
    kind: MediaKind,
    driver: SessionDriver,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    fallback_tick: Duration,
}

impl PreviewSessionActor {
    pub(super) fn new(
        session_id: SessionId,
        media_id: MediaId,
        kind: MediaKind,
        driver: SessionDriver,
        receiver: mpsc::Receiver<SessionMessage>,
        cancel_token: CancellationToken,
        fallback_tick: Duration,
    ) -> Self {
        Self {
            session_id,
            media_id,
            kind,
            driver,
            receiver,
            cancel_token,
            fallback_tick,
        }
    }

    #[instrument(
        skip_all,
        name = "preview.session",
        fields(session_id = %self.session_id, media_id = %self.media_id, kind = self.kind.as_str())
    )]
    pub(super) async fn run(mut self) -> SessionSummary {
        debug!(
            target: "preview.session",
            mode = self.driver.mode().as_str(),
            "Session actor started"
        );

        let mut fallback =
            tokio::time::interval_at(Instant::now() + self.fallback_tick, self.fallback_tick);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let end = loop {
            if let Some(end) = self.driver.terminal_end() {
                break end;
            }

            let deadline = self.driver.ready_deadline();

            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(target: "preview.session", "Session cancelled");
                    break SessionEnd::Unmounted;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            debug!(target: "preview.session", "All handles dropped, detaching");
                            break SessionEnd::Detached;
                        }
                    }
                }

                _ = fallback.tick() => {
                    self.driver.tick(Instant::now());
                }

                () = wait_for(deadline) => {
                    self.driver.expire_ready_deadline(Instant::now());
                }
            }
        };

        let summary = self.driver.finish(end, Instant::now());

        info!(
            target: "preview.session",
            end = end.as_str(),
            elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            events_processed = summary.events_processed,
            events_dropped = summary.events_dropped,
            "Session actor stopped"
        );

        summary
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Embed(event) => {
                // Unmount may land between recv and here
                if self.cancel_token.is_cancelled() {
                    self.driver.reject_stale();
                    return;
                }
                self.driver.handle_embed(event, Instant::now());
            }
            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.driver.gate().snapshot(Instant::now()));
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
