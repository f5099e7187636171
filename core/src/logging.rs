//! Tracing subscriber setup for the command-line front end.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for a number of `-v` flags.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the verbosity level. Calling it twice is a no-op.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init();
}
