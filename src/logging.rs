use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for ssmbatch
///
/// This sets up colored output for terminals with automatic detection of:
/// - NO_COLOR environment variable (disables colors)
/// - RUST_LOG environment variable for filtering
/// - SSMBATCH_LOG_FORMAT=json for machine-readable output in CI jobs
pub fn init_logging() {
    let use_ansi = should_use_colors();

    // Defaults to "info" if RUST_LOG is not set or unparseable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json_format() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(use_ansi)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .without_time()
                    .compact(),
            )
            .init();
    }
}

/// Determine if we should use ANSI colors based on environment
fn should_use_colors() -> bool {
    if env::var("NO_COLOR").is_ok() || env::var("SSMBATCH_NO_COLOR").is_ok() {
        return false;
    }

    if env::var("FORCE_COLOR").is_ok() || env::var("SSMBATCH_FORCE_COLOR").is_ok() {
        return true;
    }

    // Default to true - tracing-subscriber will handle TTY detection
    true
}

fn use_json_format() -> bool {
    env::var("SSMBATCH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
