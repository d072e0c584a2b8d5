//! Deterministic scenario replay.
//!
//! Runs a recorded sequence of embed events through the same session logic the
//! actor uses, on a virtual timeline. Fallback ticks and the ready deadline are
//! simulated at their exact instants, so a scenario always yields the same
//! report regardless of host scheduling.
//!
//! ```json
//! {
//!   "media_id": "5d5bc37ffcf54c9b82e996823bffbb81",
//!   "kind": "stream",
//!   "access": {"mode": "explicit", "budget_secs": 30},
//!   "events": [
//!     {"at_ms": 0, "type": "loaded"},
//!     {"at_ms": 0, "type": "message", "origin": "https://iframe.videodelivery.net",
//!      "data": {"__privateUnstableMessageType": "event", "eventName": "play"}}
//!   ]
//! }
//! ```
//!
//! Ordering at equal instants matches the actor: embed events are handled
//! before a tick due at the same instant, and a tick before the ready deadline.

use crate::adapters;
use crate::budget::{BudgetSet, PageContext, PreviewBudgetSelector, Selection, ViewerTier};
use crate::config::Config;
use crate::embed::{EmbedControl, EmbedEvent};
use crate::gate::{GateCause, GateController, GateState, Outcome};
use crate::observability::metrics;
use crate::policy::PreviewBudget;
use crate::session::driver::SessionDriver;
use crate::session::SessionEnd;
use crate::types::{MediaId, MediaKind};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
}

/// How the scenario's viewer is entitled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScenarioAccess {
    /// Budget and entitlement given directly.
    Explicit {
        #[serde(default)]
        entitled: bool,
        budget_secs: Option<u32>,
    },
    /// Looked up the way the host page does at mount.
    Selected {
        budgets: BudgetSet,
        page: PageContext,
        tier: ViewerTier,
    },
}

impl Default for ScenarioAccess {
    fn default() -> Self {
        ScenarioAccess::Explicit {
            entitled: false,
            budget_secs: None,
        }
    }
}

impl ScenarioAccess {
    #[must_use]
    pub fn selection(&self) -> Selection {
        match self {
            ScenarioAccess::Explicit {
                entitled,
                budget_secs,
            } => Selection {
                budget: PreviewBudget::from_seconds(*budget_secs),
                entitled: *entitled,
            },
            ScenarioAccess::Selected {
                budgets,
                page,
                tier,
            } => PreviewBudgetSelector::new(*budgets).select(*page, *tier),
        }
    }
}

/// An embed event at a point on the timeline, relative to mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: EmbedEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub media_id: MediaId,
    pub kind: MediaKind,
    #[serde(default)]
    pub access: ScenarioAccess,
    /// Overrides the configured fallback tick.
    #[serde(default)]
    pub fallback_tick_ms: Option<u64>,
    /// The host tears the player down at this instant.
    #[serde(default)]
    pub unmount_at_ms: Option<u64>,
    /// End of the timeline. Defaults to the last step plus the budget, the
    /// adapter's ready timeout and one fallback tick.
    #[serde(default)]
    pub run_until_ms: Option<u64>,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub media_id: MediaId,
    pub kind: MediaKind,
    /// `None` when the session was still open at the end of the timeline.
    pub end: Option<SessionEnd>,
    pub final_state: GateState,
    pub elapsed_ms: u64,
    pub remaining_ms: Option<u64>,
    pub gated_at_ms: Option<u64>,
    pub gate_cause: Option<GateCause>,
    pub lock_callbacks: usize,
    pub source_cleared: bool,
    pub fallback_only: bool,
    pub events_processed: u64,
    pub events_dropped: u64,
}

enum Step<'a> {
    Embed(&'a EmbedEvent),
    Unmount,
}

struct ReplayEmbed(Arc<AtomicBool>);

impl EmbedControl for ReplayEmbed {
    fn clear_source(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Replay a scenario on a virtual timeline.
pub fn replay(scenario: &Scenario, config: &Config) -> Result<ReplayReport, ReplayError> {
    let tick = scenario
        .fallback_tick_ms
        .map_or(config.fallback_tick, Duration::from_millis);
    if tick.is_zero() {
        return Err(ReplayError::InvalidScenario(
            "fallback_tick_ms must be greater than zero".to_string(),
        ));
    }

    let mut steps: Vec<(u64, Step<'_>)> = scenario
        .events
        .iter()
        .map(|timed| (timed.at_ms, Step::Embed(&timed.event)))
        .collect();
    if let Some(at_ms) = scenario.unmount_at_ms {
        steps.push((at_ms, Step::Unmount));
    }
    // Stable: equal instants keep input order, with unmount after them
    steps.sort_by_key(|(at_ms, _)| *at_ms);

    let selection = scenario.access.selection();
    let adapter = adapters::attach(scenario.kind, config);
    let last_step_ms = steps.last().map_or(0, |(at_ms, _)| *at_ms);
    // Long enough for a missed ready deadline, the whole budget and the tick
    // that observes it
    let horizon_ms = scenario.run_until_ms.unwrap_or_else(|| {
        [
            selection.budget.limit(),
            adapter.ready_timeout(),
            Some(tick),
        ]
        .into_iter()
        .flatten()
        .fold(last_step_ms, |acc, span| acc.saturating_add(as_millis(span)))
    });

    let base = Instant::now();
    let at = |ms: u64| base + Duration::from_millis(ms);
    let since_mount = |instant: Instant| as_millis(instant.saturating_duration_since(base));

    let locks = Arc::new(AtomicUsize::new(0));
    let cleared = Arc::new(AtomicBool::new(false));
    let lock_counter = Arc::clone(&locks);
    let mut gate = GateController::new(
        selection.policy(),
        Box::new(ReplayEmbed(Arc::clone(&cleared))),
        Box::new(move || {
            lock_counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    metrics::record_session_mounted(scenario.kind.as_str());
    debug!(
        target: "preview.session",
        media_id = %scenario.media_id,
        kind = scenario.kind.as_str(),
        steps = steps.len(),
        horizon_ms,
        "Replaying scenario"
    );

    let report = |driver_state: (GateState, Duration, Option<Duration>),
                  end: Option<SessionEnd>,
                  gated: Option<(Instant, GateCause)>,
                  fallback_only: bool,
                  counters: (u64, u64)| {
        let (final_state, elapsed, remaining) = driver_state;
        ReplayReport {
            media_id: scenario.media_id.clone(),
            kind: scenario.kind,
            end,
            final_state,
            elapsed_ms: as_millis(elapsed),
            remaining_ms: remaining.map(as_millis),
            gated_at_ms: gated.map(|(instant, _)| since_mount(instant)),
            gate_cause: gated.map(|(_, cause)| cause),
            lock_callbacks: locks.load(Ordering::SeqCst),
            source_cleared: cleared.load(Ordering::SeqCst),
            fallback_only,
            events_processed: counters.0,
            events_dropped: counters.1,
        }
    };

    if let Outcome::Gated(cause) = gate.mount(base) {
        metrics::record_gate_fired(scenario.kind.as_str(), cause.as_str());
        metrics::record_session_ended(scenario.kind.as_str(), SessionEnd::LockedAtMount.as_str());
        let snapshot = gate.snapshot(base);
        return Ok(report(
            (snapshot.state, snapshot.elapsed, snapshot.remaining),
            Some(SessionEnd::LockedAtMount),
            gate.gated(),
            false,
            (0, 0),
        ));
    }

    let mut driver = SessionDriver::new(gate, adapter);
    let mut next_tick = base + tick;
    let mut end = None;

    for (at_ms, step) in &steps {
        let now = at(*at_ms);
        run_timers(&mut driver, &mut next_tick, tick, now, false);
        if driver.is_finished() {
            break;
        }

        match step {
            Step::Embed(event) => driver.handle_embed((*event).clone(), now),
            Step::Unmount => {
                end = Some(SessionEnd::Unmounted);
                break;
            }
        }
    }

    let final_at = match end {
        Some(SessionEnd::Unmounted) => at(scenario.unmount_at_ms.unwrap_or(horizon_ms)),
        _ => {
            run_timers(&mut driver, &mut next_tick, tick, at(horizon_ms), true);
            // A budget exhausted between grid ticks is still observed at the end
            if !driver.is_finished() {
                driver.tick(at(horizon_ms));
            }
            driver
                .gate()
                .gated()
                .map_or_else(|| at(horizon_ms), |(gated_at, _)| gated_at)
        }
    };

    if driver.gate().state() == GateState::Gated {
        end = Some(SessionEnd::Gated);
    }
    let fallback_only = driver.mode() == adapters::TrackingMode::FallbackOnly;
    let gated = driver.gate().gated();

    let snapshot = match end {
        Some(end) => {
            let summary = driver.finish(end, final_at);
            let snapshot = driver.gate().snapshot(final_at);
            (summary.final_state, summary.elapsed, snapshot.remaining)
        }
        None => {
            metrics::record_session_released();
            let snapshot = driver.gate().snapshot(final_at);
            (snapshot.state, snapshot.elapsed, snapshot.remaining)
        }
    };

    let report = report(
        snapshot,
        end,
        gated,
        fallback_only,
        (driver.events_processed(), driver.events_dropped()),
    );

    info!(
        target: "preview.session",
        media_id = %report.media_id,
        final_state = report.final_state.as_str(),
        elapsed_ms = report.elapsed_ms,
        gated_at_ms = report.gated_at_ms,
        "Replay finished"
    );

    Ok(report)
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Fire every tick and ready deadline due before `until` (or at it, when
/// `inclusive`), stopping as soon as the session finishes.
fn run_timers(
    driver: &mut SessionDriver,
    next_tick: &mut Instant,
    tick: Duration,
    until: Instant,
    inclusive: bool,
) {
    loop {
        if driver.is_finished() {
            return;
        }

        let deadline = driver.ready_deadline().filter(|d| *d < *next_tick);
        let due = deadline.unwrap_or(*next_tick);
        if due > until || (!inclusive && due == until) {
            return;
        }

        match deadline {
            Some(at) => driver.expire_ready_deadline(at),
            None => {
                driver.tick(due);
                *next_tick += tick;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use serde_json::json;

    fn scenario(value: serde_json::Value) -> Scenario {
        serde_json::from_value(value).unwrap()
    }

    fn stream_message(at_ms: u64, data: serde_json::Value) -> serde_json::Value {
        json!({
            "at_ms": at_ms,
            "type": "message",
            "origin": "https://iframe.videodelivery.net",
            "data": data
        })
    }

    fn current_time(at_ms: u64, seconds: f64) -> serde_json::Value {
        stream_message(
            at_ms,
            json!({
                "__privateUnstableMessageType": "propertyChange",
                "property": "currentTime",
                "value": seconds
            }),
        )
    }

    fn stream_event(at_ms: u64, name: &str) -> serde_json::Value {
        stream_message(
            at_ms,
            json!({"__privateUnstableMessageType": "event", "eventName": name}),
        )
    }

    fn stream_scenario(events: Vec<serde_json::Value>) -> Scenario {
        scenario(json!({
            "media_id": "stream-uid",
            "kind": "stream",
            "access": {"mode": "explicit", "budget_secs": 30},
            "run_until_ms": 120_000,
            "events": events
        }))
    }

    #[test]
    fn test_youtube_gates_after_budget_of_wall_time() {
        let scenario = scenario(json!({
            "media_id": "dQw4w9WgXcQ",
            "kind": "youtube",
            "access": {"mode": "explicit", "budget_secs": 30},
            "events": [{"at_ms": 0, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.end, Some(SessionEnd::Gated));
        assert_eq!(report.gated_at_ms, Some(30_000));
        assert_eq!(report.gate_cause, Some(GateCause::FallbackTick));
        assert_eq!(report.elapsed_ms, 30_000);
        assert_eq!(report.lock_callbacks, 1);
        assert!(report.source_cleared);
    }

    #[test]
    fn test_stream_sample_gates_at_31() {
        let scenario = stream_scenario(vec![
            json!({"at_ms": 0, "type": "loaded"}),
            stream_event(0, "play"),
            current_time(10_000, 10.0),
            stream_event(10_000, "pause"),
            stream_event(20_000, "play"),
            current_time(21_000, 31.0),
        ]);

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.gated_at_ms, Some(21_000));
        assert_eq!(report.gate_cause, Some(GateCause::Signal));
        assert_eq!(report.elapsed_ms, 31_000);
        assert_eq!(report.remaining_ms, Some(0));
        assert_eq!(report.lock_callbacks, 1);
    }

    #[test]
    fn test_input_order_does_not_matter_for_distinct_instants() {
        let ordered = stream_scenario(vec![
            stream_event(0, "play"),
            current_time(5_000, 5.0),
            stream_event(8_000, "pause"),
            stream_event(12_000, "play"),
        ]);
        let shuffled = stream_scenario(vec![
            stream_event(12_000, "play"),
            current_time(5_000, 5.0),
            stream_event(0, "play"),
            stream_event(8_000, "pause"),
        ]);

        let a = replay(&ordered, &Config::default()).unwrap();
        let b = replay(&shuffled, &Config::default()).unwrap();

        assert_eq!(a, b);
        // 8s before the pause, then 22s more after resuming at 12s
        assert_eq!(a.gated_at_ms, Some(34_000));
    }

    #[test]
    fn test_backward_seek_buys_no_time() {
        let scenario = stream_scenario(vec![
            stream_event(0, "play"),
            current_time(20_000, 20.0),
            current_time(21_000, 2.0),
        ]);

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.gated_at_ms, Some(30_000));
        assert_eq!(report.events_processed, 3);
    }

    #[test]
    fn test_unmount_before_budget() {
        let mut scenario = stream_scenario(vec![stream_event(0, "play")]);
        scenario.unmount_at_ms = Some(12_000);

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.end, Some(SessionEnd::Unmounted));
        assert_eq!(report.final_state, GateState::Unmounted);
        assert_eq!(report.elapsed_ms, 12_000);
        assert_eq!(report.lock_callbacks, 0);
        assert!(!report.source_cleared);
    }

    #[test]
    fn test_selected_subscriber_never_gates() {
        let scenario = scenario(json!({
            "media_id": "track-1",
            "kind": "audio",
            "access": {
                "mode": "selected",
                "budgets": {"standard": 0, "member_preview": 0},
                "page": "public",
                "tier": "subscriber"
            },
            "run_until_ms": 3_600_000,
            "events": [{"at_ms": 0, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.end, None);
        assert_eq!(report.remaining_ms, None);
        assert_eq!(report.lock_callbacks, 0);
    }

    #[test]
    fn test_zero_budget_reports_locked_at_mount() {
        let scenario = scenario(json!({
            "media_id": "track-2",
            "kind": "audio",
            "access": {"mode": "explicit", "budget_secs": 0},
            "events": [{"at_ms": 0, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.end, Some(SessionEnd::LockedAtMount));
        assert_eq!(report.gated_at_ms, Some(0));
        assert_eq!(report.gate_cause, Some(GateCause::LockedAtMount));
        assert_eq!(report.events_processed, 0);
        assert_eq!(report.lock_callbacks, 1);
    }

    #[test]
    fn test_audio_ready_timeout_starts_timer() {
        let scenario = scenario(json!({
            "media_id": "track-3",
            "kind": "audio",
            "access": {"mode": "explicit", "budget_secs": 30},
            "run_until_ms": 60_000,
            "events": [{"at_ms": 0, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert!(report.fallback_only);
        assert_eq!(report.gated_at_ms, Some(35_000));
    }

    #[test]
    fn test_default_timeline_covers_off_grid_load() {
        let scenario = scenario(json!({
            "media_id": "dQw4w9WgXcQ",
            "kind": "youtube",
            "access": {"mode": "explicit", "budget_secs": 30},
            "events": [{"at_ms": 500, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        // Budget runs out at 30.5s, the next grid tick sees it
        assert_eq!(report.end, Some(SessionEnd::Gated));
        assert_eq!(report.final_state, GateState::Gated);
        assert_eq!(report.gated_at_ms, Some(31_000));
        assert_eq!(report.remaining_ms, Some(0));
        assert_eq!(report.lock_callbacks, 1);
    }

    #[test]
    fn test_default_timeline_covers_audio_ready_timeout() {
        let scenario = scenario(json!({
            "media_id": "track-4",
            "kind": "audio",
            "access": {"mode": "explicit", "budget_secs": 30},
            "events": [{"at_ms": 0, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert!(report.fallback_only);
        assert_eq!(report.end, Some(SessionEnd::Gated));
        assert_eq!(report.gated_at_ms, Some(35_000));
        assert_eq!(report.elapsed_ms, 30_000);
        assert_eq!(report.lock_callbacks, 1);
    }

    #[test]
    fn test_budget_exhausted_at_horizon_gates() {
        let scenario = scenario(json!({
            "media_id": "dQw4w9WgXcQ",
            "kind": "youtube",
            "access": {"mode": "explicit", "budget_secs": 30},
            "run_until_ms": 30_700,
            "events": [{"at_ms": 500, "type": "loaded"}]
        }));

        let report = replay(&scenario, &Config::default()).unwrap();

        assert_eq!(report.end, Some(SessionEnd::Gated));
        assert_eq!(report.gated_at_ms, Some(30_700));
        assert_eq!(report.gate_cause, Some(GateCause::FallbackTick));
        assert_eq!(report.elapsed_ms, 30_200);
        assert_eq!(report.lock_callbacks, 1);
    }

    #[test]
    fn test_open_session_releases_active_gauge() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let scenario =
            stream_scenario(vec![stream_event(0, "play"), stream_event(5_000, "pause")]);

        let report = ::metrics::with_local_recorder(&recorder, || {
            replay(&scenario, &Config::default()).unwrap()
        });

        assert_eq!(report.end, None);
        let active: f64 = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.key().name() == "preview_sessions_active")
            .map(|(.., value)| match value {
                DebugValue::Gauge(v) => v.into_inner(),
                _ => 0.0,
            })
            .sum();
        assert!(active.abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_zero_tick() {
        let mut scenario = stream_scenario(vec![]);
        scenario.fallback_tick_ms = Some(0);

        assert!(matches!(
            replay(&scenario, &Config::default()),
            Err(ReplayError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        assert!(matches!(
            Scenario::from_json("{\"kind\": \"vhs\"}"),
            Err(ReplayError::Parse(_))
        ));
    }
}
