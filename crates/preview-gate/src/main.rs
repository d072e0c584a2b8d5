//! Preview Replay
//!
//! Replays a recorded preview scenario on a virtual timeline and prints the
//! resulting report as JSON.
//!
//! ```text
//! preview-replay scenario.json
//! preview-replay < scenario.json
//! ```
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `preview=info`).
//! Set `PREVIEW_LOG_FORMAT=json` for structured log lines. Engine settings come
//! from the `PREVIEW_*` environment variables.

#![warn(clippy::pedantic)]

use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use preview_gate::config::Config;
use preview_gate::replay::{replay, Scenario};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;

    let raw = match std::env::args().nth(1) {
        Some(path) if path != "-" => {
            fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read scenario from stdin")?;
            buf
        }
    };

    let scenario = Scenario::from_json(&raw)?;
    info!(
        media_id = %scenario.media_id,
        kind = scenario.kind.as_str(),
        events = scenario.events.len(),
        "Loaded scenario"
    );

    let report = replay(&scenario, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "preview=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("PREVIEW_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}
