//! # Preview Test Utilities
//!
//! Shared test utilities for the preview gating engine.
//!
//! This crate provides a recording embed, a lock-callback spy and builders
//! for the embeds' native message payloads, so session tests can drive a
//! player without a browser.
//!
//! ## Modules
//!
//! - `mock_embed` - `RecordingEmbed` and `LockSpy`
//! - `fixtures` - Embed message payloads and a `TestSession` harness
//!
//! ## Usage
//!
//! ```rust,ignore
//! use preview_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let session = TestSession::mount(MediaKind::Stream, Some(30));
//!
//!     session.handle.deliver(STREAM_ORIGIN, stream_event("play")).await.unwrap();
//!     tokio::time::sleep(Duration::from_secs(31)).await;
//!
//!     session.assert_locked_once();
//! }
//! ```

pub mod fixtures;
pub mod mock_embed;

pub use fixtures::*;
pub use mock_embed::*;
