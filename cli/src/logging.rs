use colored::*;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber. `RUST_LOG` wins over the configured
/// level; logs go to stderr so they do not interleave with the chat.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn log_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
