// Structured logging setup
//
// Builds the global tracing subscriber from the logging configuration.
// RUST_LOG, when set, takes precedence over the configured level.

use crate::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Resolve the default level: `--verbose` forces DEBUG, otherwise the
/// configured level, falling back to INFO on a bad value.
pub fn default_level(config: &LoggingConfig, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    config.level.to_lowercase().parse().unwrap_or(Level::INFO)
}

/// Build the env filter with the given default directive
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Returns false if a subscriber was already installed.
pub fn init(config: &LoggingConfig, verbose: bool) -> bool {
    let filter = env_filter(default_level(config, verbose));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };

    result.is_ok()
}
