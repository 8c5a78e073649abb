//! Logging initialization for the sample host.

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    pub default_level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            json: false,
        }
    }
}

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` wins over `default_level`. Stdout is left to the stdout
/// destination.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if config.json {
        builder.json().finish().init();
    } else {
        builder.compact().finish().init();
    }
}
