use crate::config::ConfigError;
use tracing_subscriber::{fmt::Subscriber, util::SubscriberInitExt, EnvFilter};

const ACCEPTED_LOG_LEVELS: [&str; 6] = ["off", "trace", "debug", "info", "warn", "error"];

pub fn validate_level(log_level: &str) -> Result<(), ConfigError> {
    if ACCEPTED_LOG_LEVELS.contains(&log_level) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "log_level '{}' (expected one of {})",
            log_level,
            ACCEPTED_LOG_LEVELS.join(", ")
        )))
    }
}

/// Logs go to stderr so they never interleave with the chat on stdout.
pub fn init(log_level: &str) -> Result<(), ConfigError> {
    validate_level(log_level)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let installed = Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init();

    // Only one global subscriber per process; a later init keeps the first
    if let Err(e) = installed {
        tracing::debug!(error = %e, "logging already initialized");
    }
    Ok(())
}
