use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Build the log filter: the `-v` count wins, then `RUST_LOG` directives
/// (`warn`, `certpulse=debug`, ...), then INFO
#[must_use]
pub fn filter(verbosity: u8, rust_log: Option<&str>) -> EnvFilter {
    match verbosity {
        0 => rust_log
            .and_then(|s| EnvFilter::try_new(s.trim()).ok())
            .unwrap_or_else(|| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the global fmt subscriber, writing to stderr so stdout only
/// carries JSON reports
///
/// # Errors
///
/// Returns an error if a global subscriber is already set
pub fn init(verbosity: u8) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter(verbosity, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to set tracing subscriber: {e}"))
}
