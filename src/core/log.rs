// Logging initialization
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Per-target levels. Skipped records and failed writes log at warn, so warn
/// is the floor for the app. sqlx statement logging stays at warn even when
/// verbose.
fn targets(verbose: bool) -> Targets {
    let app_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    Targets::new()
        .with_target("ratesync", app_level)
        .with_target("sqlx::query", LevelFilter::WARN)
        .with_default(LevelFilter::WARN)
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(targets(verbose))
        .with(env_filter)
        .init();
}
