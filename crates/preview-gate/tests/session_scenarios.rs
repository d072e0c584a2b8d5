//! End-to-end session scenarios.
//!
//! Uses tokio's paused clock so fallback ticks and ready deadlines fire at
//! exact instants:
//! - Audio widget gating from `playProgress` samples
//! - Buffering stalls pausing the estimate
//! - Budget selection feeding a mounted session
//! - Teardown with events still queued
//! - Independent concurrent sessions

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use preview_gate::budget::{BudgetSet, PageContext, PreviewBudgetSelector, ViewerTier};
use preview_gate::config::Config;
use preview_gate::gate::GateState;
use preview_gate::policy::PreviewBudget;
use preview_gate::session::{SessionEnd, SessionParams};
use preview_gate::types::{MediaId, MediaKind};
use preview_gate::PreviewError;
use preview_test_utils::*;

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

// ============================================================================
// Audio widget
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_audio_progress_gates_session() {
    let session = TestSession::mount(MediaKind::Audio, Some(20));

    session.handle.embed_loaded().await.unwrap();
    session
        .handle
        .deliver(AUDIO_ORIGIN, audio_method("ready"))
        .await
        .unwrap();
    session
        .handle
        .deliver(AUDIO_ORIGIN, audio_method("play"))
        .await
        .unwrap();

    sleep_secs(5).await;
    // Widget reports further than the local estimate (skipped intro)
    session
        .handle
        .deliver(AUDIO_ORIGIN, audio_progress_ms(21_000.0))
        .await
        .unwrap();

    let (summary, embed, spy) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::Gated);
    assert_eq!(summary.final_state, GateState::Gated);
    assert_eq!(summary.elapsed, Duration::from_secs(21));
    assert_eq!(spy.count(), 1);
    assert_eq!(embed.clear_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_audio_finish_stops_the_clock() {
    let session = TestSession::mount(MediaKind::Audio, Some(30));

    session.handle.embed_loaded().await.unwrap();
    session
        .handle
        .deliver(AUDIO_ORIGIN, audio_method("play"))
        .await
        .unwrap();
    sleep_secs(12).await;
    session
        .handle
        .deliver(AUDIO_ORIGIN, audio_method("finish"))
        .await
        .unwrap();
    sleep_secs(60).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GateState::Paused);
    assert_eq!(snapshot.elapsed, Duration::from_secs(12));
    assert_eq!(snapshot.remaining, Some(Duration::from_secs(18)));
    session.assert_never_locked();

    session.handle.unmount();
    let (summary, _, _) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::Unmounted);
}

// ============================================================================
// Stream iframe
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stream_buffering_does_not_count() {
    let session = TestSession::mount(MediaKind::Stream, Some(30));

    session.handle.embed_loaded().await.unwrap();
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_event("playing"))
        .await
        .unwrap();
    sleep_secs(10).await;
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_event("waiting"))
        .await
        .unwrap();
    sleep_secs(15).await;
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_event("playing"))
        .await
        .unwrap();
    sleep_secs(5).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.elapsed, Duration::from_secs(15));
    session.assert_never_locked();

    // 15 more seconds of playback exhausts the budget
    let (summary, _, spy) = session.finish().await;
    assert_eq!(summary.elapsed, Duration::from_secs(30));
    assert_eq!(spy.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_seeking_back_buys_no_time() {
    let session = TestSession::mount(MediaKind::Stream, Some(30));

    session
        .handle
        .deliver(STREAM_ORIGIN, stream_event("play"))
        .await
        .unwrap();
    sleep_secs(25).await;
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_current_time(25.0))
        .await
        .unwrap();
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_current_time(3.0))
        .await
        .unwrap();

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.elapsed, Duration::from_secs(25));

    let (summary, _, spy) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::Gated);
    assert_eq!(summary.elapsed, Duration::from_secs(30));
    assert_eq!(spy.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_without_play_event_counts_as_playing() {
    let session = TestSession::mount(MediaKind::Stream, Some(30));

    session.handle.embed_loaded().await.unwrap();
    sleep_secs(2).await;
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_current_time(2.0))
        .await
        .unwrap();
    sleep_secs(3).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GateState::Playing);
    assert_eq!(snapshot.elapsed, Duration::from_secs(5));

    let (summary, _, spy) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::Gated);
    assert_eq!(summary.elapsed, Duration::from_secs(30));
    assert_eq!(spy.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_spoofed_origin_cannot_gate_or_extend() {
    let session = TestSession::mount(MediaKind::Stream, Some(30));

    session
        .handle
        .deliver("https://iframe.videodelivery.net.attacker.example", stream_current_time(99.0))
        .await
        .unwrap();
    session
        .handle
        .deliver(YOUTUBE_ORIGIN, stream_event("play"))
        .await
        .unwrap();
    sleep_secs(45).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GateState::Unstarted);
    session.assert_never_locked();

    session.handle.unmount();
    let (summary, _, _) = session.finish().await;
    assert_eq!(summary.events_dropped, 2);
}

// ============================================================================
// Budget selection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_member_area_budget_applies_to_session() {
    let selector = PreviewBudgetSelector::new(BudgetSet {
        standard: Some(30),
        member_preview: Some(10),
    });
    let selection = selector.select(PageContext::MemberArea, ViewerTier::Free);
    let params = SessionParams::from_selection(MediaId::new("vid-1"), MediaKind::YouTube, selection);

    let session = TestSession::mount_with(params, &Config::default());
    session.handle.embed_loaded().await.unwrap();

    let (summary, _, spy) = session.finish().await;
    assert_eq!(summary.elapsed, Duration::from_secs(10));
    assert_eq!(spy.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_is_never_gated() {
    let selector = PreviewBudgetSelector::new(BudgetSet {
        standard: Some(0),
        member_preview: Some(0),
    });
    let selection = selector.select(PageContext::Public, ViewerTier::Subscriber);
    let params = SessionParams::from_selection(MediaId::new("vid-2"), MediaKind::YouTube, selection);

    let session = TestSession::mount_with(params, &Config::default());
    session.handle.embed_loaded().await.unwrap();
    sleep_secs(3600).await;

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GateState::Playing);
    assert_eq!(snapshot.remaining, None);
    session.assert_never_locked();

    session.handle.unmount();
    session.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_budget_never_attaches() {
    let session = TestSession::mount(MediaKind::Stream, Some(0));

    session.assert_locked_once();
    assert!(matches!(
        session
            .handle
            .deliver(STREAM_ORIGIN, stream_event("play"))
            .await,
        Err(PreviewError::SessionClosed)
    ));

    let (summary, _, _) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::LockedAtMount);
}

// ============================================================================
// Teardown and isolation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unmount_with_queued_events_never_locks() {
    let session = TestSession::mount(MediaKind::Stream, Some(30));

    session
        .handle
        .deliver(STREAM_ORIGIN, stream_event("play"))
        .await
        .unwrap();
    sleep_secs(20).await;

    // Queue an over-budget sample and unmount before the actor runs again
    session
        .handle
        .deliver(STREAM_ORIGIN, stream_current_time(45.0))
        .await
        .unwrap();
    session.handle.unmount();

    let (summary, embed, spy) = session.finish().await;
    assert_eq!(summary.end, SessionEnd::Unmounted);
    assert_eq!(spy.count(), 0);
    assert!(!embed.was_cleared());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sessions_are_independent() {
    let short = TestSession::mount(MediaKind::YouTube, Some(10));
    let long = TestSession::mount(MediaKind::YouTube, Some(40));
    let config = Config {
        fallback_tick: Duration::from_millis(250),
        ..Config::default()
    };
    let fine = TestSession::mount_with(
        SessionParams::new(
            MediaId::new("vid-3"),
            MediaKind::YouTube,
            false,
            PreviewBudget::Limited(Duration::from_millis(2_500)),
        ),
        &config,
    );

    short.handle.embed_loaded().await.unwrap();
    long.handle.embed_loaded().await.unwrap();
    fine.handle.embed_loaded().await.unwrap();

    let (fine_summary, _, fine_spy) = fine.finish().await;
    assert_eq!(fine_summary.elapsed, Duration::from_millis(2_500));
    assert_eq!(fine_spy.count(), 1);

    let (short_summary, _, short_spy) = short.finish().await;
    assert_eq!(short_summary.elapsed, Duration::from_secs(10));
    assert_eq!(short_spy.count(), 1);

    let snapshot = long.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, GateState::Playing);
    assert_eq!(snapshot.elapsed, Duration::from_secs(10));
    long.assert_never_locked();

    let (long_summary, _, long_spy) = long.finish().await;
    assert_eq!(long_summary.elapsed, Duration::from_secs(40));
    assert_eq!(long_spy.count(), 1);
}
