// Define a new module for logging initialization
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`, which wins
/// over the configured `level`.
pub fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ratekeeper={level}")));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
