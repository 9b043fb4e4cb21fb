//! Tracing subscriber setup shared by the binaries

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,aptos_tradelog=debug,hyper=warn,reqwest=warn";

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Keeps stdout free for machine-readable output
    Stderr,
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the default filter; `TRADELOG_LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_logging(target: LogTarget) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("TRADELOG_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    match (target, json) {
        (LogTarget::Stdout, false) => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init(),
        (LogTarget::Stdout, true) => registry.with(fmt::layer().json()).init(),
        (LogTarget::Stderr, false) => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (LogTarget::Stderr, true) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
