//! Centralized logging initialization with environment variable support

use crate::{AppConfig, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: standard filter directives, takes precedence over the config
/// - `LOG_FORMAT`: override format (json, pretty)
///
/// Logs always go to stderr so `knipview analyze` can print results on stdout.
pub fn initialize(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    let format = format_override(std::env::var("LOG_FORMAT").ok().as_deref())
        .unwrap_or_else(|| config.logging.format.clone());

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        // A global subscriber was already installed (tests, embedding)
        tracing::debug!(error = %e, "Tracing subscriber already initialized");
    }
}

fn format_override(value: Option<&str>) -> Option<LogFormat> {
    match value?.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "human" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Span wrapping every log line of one WebSocket connection
///
/// ```rust
/// use knipview_config::logging::connection_span;
///
/// let span = connection_span("3f1c9a2e");
/// let _enter = span.enter();
/// tracing::info!("Processing call");
/// ```
pub fn connection_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("connection", session_id = %session_id)
}

/// Span for a single served RPC call
pub fn call_span(method: &str, call_id: Option<&str>) -> tracing::Span {
    tracing::debug_span!(
        "call",
        method = %method,
        call_id = call_id.unwrap_or("-")
    )
}
