//! Preview Gate Library
//!
//! Playback-time accounting for protected media rendered through third-party
//! embeds. A non-entitled viewer may watch or listen to the first N seconds of
//! *actual playback*; once that budget is spent the player is stopped and the
//! host page is told to render its locked overlay.
//!
//! # Architecture
//!
//! One session actor per rendered player instance:
//!
//! ```text
//! PreviewSessionActor (one per mounted player)
//! ├── SessionDriver
//! │   ├── boxed EventSource (YouTube | Stream | Audio widget)
//! │   │   └── translates embed postMessage payloads into Play / Pause / ProgressSample
//! │   └── GateController
//! │       ├── PlaybackClock   (fallback estimate + authoritative corrections)
//! │       └── PreviewPolicy   (budget, entitlement)
//! └── owns the mailbox, the fallback interval and the embed ready deadline
//! ```
//!
//! # Key Design Decisions
//!
//! - **Fallback timer is a lower bound**: authoritative samples correct the
//!   estimate upward with a `max` merge and can never move it backward
//! - **Gated is terminal**: the lock callback is an `FnOnce` taken out of the
//!   controller at the transition, so it fires at most once per session
//! - **Scoped listeners**: the mailbox, interval and deadline live inside the
//!   actor task and are released when it returns
//! - **Silent degradation**: adapter failures fall back to timer-only tracking
//!
//! # Modules
//!
//! - [`adapters`] - Embed-specific `EventSource` implementations
//! - [`budget`] - Budget selection from page context and viewer tier
//! - [`clock`] - `PlaybackClock` accumulator
//! - [`config`] - Engine configuration from environment
//! - [`embed`] - Embed events and the control surface over the rendered player
//! - [`errors`] - Error types
//! - [`gate`] - `GateController` state machine
//! - [`observability`] - Metrics
//! - [`policy`] - `PreviewPolicy` and `PreviewBudget`
//! - [`replay`] - Deterministic scenario replay with virtual time
//! - [`session`] - Session actor and handle

pub mod adapters;
pub mod budget;
pub mod clock;
pub mod config;
pub mod embed;
pub mod errors;
pub mod gate;
pub mod observability;
pub mod policy;
pub mod replay;
pub mod session;
pub mod types;

pub use budget::{BudgetSet, PageContext, PreviewBudgetSelector, Selection, ViewerTier};
pub use clock::PlaybackClock;
pub use config::Config;
pub use embed::{EmbedControl, EmbedEvent, EmbedMessage, LockCallback};
pub use errors::{AdapterError, PreviewError};
pub use gate::{GateCause, GateController, GateState, Outcome, PlaybackSnapshot};
pub use policy::{PreviewBudget, PreviewPolicy};
pub use session::{PreviewSession, PreviewSessionHandle, SessionEnd, SessionParams, SessionSummary};
pub use types::{MediaId, MediaKind, SessionId};
