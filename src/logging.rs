use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FORMAT_VAR: &str = "RUST_LOG_FORMAT";

/// Whether a `RUST_LOG_FORMAT` value asks for JSON lines.
pub fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Install the subscriber for the binaries. Plain logs on stderr by default;
/// JSON lines when `RUST_LOG_FORMAT=json`. `RUST_LOG` filters, warn otherwise.
pub fn init_tracing() {
    let use_json = wants_json(std::env::var(LOG_FORMAT_VAR).ok().as_deref());
    let filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy();

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
