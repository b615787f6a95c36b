//! Tracing subscriber setup.

use crate::config::{LoggingConfig, log_dir};
use crate::error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. With
/// `log_to_file` set, logs are also written to a daily rolling file in the
/// log directory; keep the returned guard alive until exit so buffered
/// lines get flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.filter)?,
    };

    let (file_layer, guard) = if config.log_to_file {
        let dir = log_dir()?;
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(&dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install log subscriber: {e}")))?;

    Ok(guard)
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| Error::config(format!("Invalid log filter '{directives}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(parse_filter(&LoggingConfig::default().filter).is_ok());
        assert!(parse_filter("tickerboard=debug,tokio=warn").is_ok());
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let err = parse_filter("tickerboard=loud").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
