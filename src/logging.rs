//! Logging setup. stdout carries IPC replies, so all log output goes to
//! stderr.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter precedence: explicit directive, then `RUST_LOG`, then `info`.
pub fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // try_init so a second call (tests, embedding) is a no-op instead of a panic.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
