//! Logging initialization for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - 0 = WARN, 1 = DEBUG, 2+ = TRACE
/// * `decisions` - raise the floor to INFO for indexify targets, so verbose/debug
///   decision logs from the rewriter are shown
/// * `json` - emit JSON lines to stderr
///
/// `RUST_LOG` is honored; the flags add directives on top of it.
pub fn init(verbosity: u8, decisions: bool, json: bool) {
    let level = match verbosity {
        0 if decisions => Some(Level::INFO),
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Some(level) = level {
        for target in ["indexify_core", "indexify_cli"] {
            if let Ok(directive) = format!("{target}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    // try_init: tests may initialize more than once
    let result = if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}
