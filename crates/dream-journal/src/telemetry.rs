//! Log subscriber for the command line.
use tracing_subscriber::{fmt, EnvFilter};

/// Journal events at info, dependencies (HTTP client, pool) only when they warn.
pub const DEFAULT_LOG_FILTER: &str = "dream_journal=info,warn";

/// `--verbose`: request and storage details from the journal itself.
pub const VERBOSE_LOG_FILTER: &str = "dream_journal=debug,warn";

/// Install the global subscriber on stderr so stdout stays valid JSON.
///
/// `RUST_LOG` wins over `default_filter` when it is set, non-blank and parses.
pub fn init_tracing(default_filter: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(std::env::var("RUST_LOG").ok(), default_filter))
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_filter(rust_log: Option<String>, default_filter: &str) -> EnvFilter {
    let directives = filter_directives(rust_log, default_filter);
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid RUST_LOG {:?}: {}", directives, e);
        EnvFilter::new(default_filter)
    })
}

fn filter_directives(rust_log: Option<String>, default_filter: &str) -> String {
    rust_log
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_filter.to_string())
}
