//! Mock embed control and lock-callback spy.
//!
//! Both keep their observations behind shared atomics, so a test can hand the
//! boxed value to a session and still inspect it afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use preview_test_utils::{LockSpy, RecordingEmbed};
//!
//! let embed = RecordingEmbed::new();
//! let spy = LockSpy::new();
//!
//! let (handle, task) = PreviewSession::mount(params, &config, embed.boxed(), spy.callback());
//! // ...
//! assert!(embed.was_cleared());
//! assert_eq!(spy.count(), 1);
//! ```

use preview_gate::embed::{EmbedControl, LockCallback};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records `clear_source` calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmbed {
    clears: Arc<AtomicUsize>,
}

impl RecordingEmbed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed control sharing this recorder's counter.
    #[must_use]
    pub fn boxed(&self) -> Box<dyn EmbedControl> {
        Box::new(self.clone())
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn was_cleared(&self) -> bool {
        self.clear_count() > 0
    }
}

impl EmbedControl for RecordingEmbed {
    fn clear_source(&mut self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts lock-callback invocations.
#[derive(Debug, Clone, Default)]
pub struct LockSpy {
    calls: Arc<AtomicUsize>,
}

impl LockSpy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that increments this spy.
    #[must_use]
    pub fn callback(&self) -> LockCallback {
        let calls = Arc::clone(&self.calls);
        Box::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_embed_shares_counter() {
        let embed = RecordingEmbed::new();
        let mut boxed = embed.boxed();

        assert!(!embed.was_cleared());
        boxed.clear_source();
        assert_eq!(embed.clear_count(), 1);
    }

    #[test]
    fn test_lock_spy_counts_calls() {
        let spy = LockSpy::new();

        (spy.callback())();
        (spy.callback())();

        assert_eq!(spy.count(), 2);
    }
}
