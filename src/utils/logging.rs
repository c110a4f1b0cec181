use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Only the binary calls this; the library
/// just emits events.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate::utils::consts::LOG_LEVEL));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
