//! Metrics definitions for the preview gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `preview_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `kind`: 3 values (youtube, stream, audio)
//! - `cause`: 3 values (locked_at_mount, signal, fallback_tick)
//! - `reason`: bounded drop / fallback reasons (~5 values)
//! - `end`: 4 values (locked_at_mount, gated, unmounted, detached)

use metrics::{counter, gauge};

/// Record a player mounting a preview session.
///
/// Metric: `preview_sessions_mounted_total`
/// Labels: `kind`
pub fn record_session_mounted(kind: &str) {
    counter!("preview_sessions_mounted_total", "kind" => kind.to_string()).increment(1);
    gauge!("preview_sessions_active").increment(1.0);
}

/// Record a session ending.
///
/// Metric: `preview_sessions_ended_total`
/// Labels: `kind`, `end`
pub fn record_session_ended(kind: &str, end: &str) {
    counter!(
        "preview_sessions_ended_total",
        "kind" => kind.to_string(),
        "end" => end.to_string()
    )
    .increment(1);
    gauge!("preview_sessions_active").decrement(1.0);
}

/// Release an active session without counting an end, for replays whose
/// timeline stops while the session is still open.
///
/// Metric: `preview_sessions_active`
pub fn record_session_released() {
    gauge!("preview_sessions_active").decrement(1.0);
}

/// Record a gate transition.
///
/// Metric: `preview_gates_fired_total`
/// Labels: `kind`, `cause`
///
/// A high `fallback_tick` share for authoritative embeds means samples are
/// arriving late or not at all.
pub fn record_gate_fired(kind: &str, cause: &str) {
    counter!(
        "preview_gates_fired_total",
        "kind" => kind.to_string(),
        "cause" => cause.to_string()
    )
    .increment(1);
}

/// Record an embed event that was dropped without touching the clock.
///
/// Metric: `preview_signals_dropped_total`
/// Labels: `kind`, `reason` (untrusted_origin, malformed, stale)
pub fn record_signal_dropped(kind: &str, reason: &str) {
    counter!(
        "preview_signals_dropped_total",
        "kind" => kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a backward sample clamped by an adapter.
///
/// Metric: `preview_samples_clamped_total`
/// Labels: `kind`
pub fn record_sample_clamped(kind: &str) {
    counter!("preview_samples_clamped_total", "kind" => kind.to_string()).increment(1);
}

/// Record an adapter degrading to timer-only tracking.
///
/// Metric: `preview_adapter_fallbacks_total`
/// Labels: `kind`, `reason` (script_unavailable, ready_timeout)
pub fn record_adapter_fallback(kind: &str, reason: &str) {
    counter!(
        "preview_adapter_fallbacks_total",
        "kind" => kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}
