//! Observability for the preview gate.
//!
//! - [`metrics`] - counters and gauges emitted through the `metrics` facade
//!
//! The library never installs a recorder; the embedding application decides
//! where metrics go. Logging uses `tracing` with the `preview.*` targets.

pub mod metrics;
