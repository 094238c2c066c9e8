//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.

use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Level filter: the chosen level for ferry and tower-http, but hyper's
/// connection internals stay at `warn` unless tracing everything.
#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    let tracing_level = level.to_tracing_level();
    let noisy = match level {
        LogLevel::Trace => tracing::Level::TRACE,
        _ => tracing::Level::WARN.min(tracing_level),
    };
    Targets::new()
        .with_default(tracing_level)
        .with_target("hyper_util", noisy)
        .with_target("rustls", noisy)
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = filter(level);

    #[cfg(feature = "sentry-integration")]
    let registry = tracing_subscriber::registry().with(sentry_tracing::layer());
    #[cfg(not(feature = "sentry-integration"))]
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Json => {
            registry
                .with(filter)
                .with(fmt::layer().json().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            registry.with(filter).with(fmt::layer().pretty()).init();
        }
    }
}
