//! Process-wide `tracing` subscriber setup.
//!
//! Access log records and every other event go through `tracing`; this
//! module only decides where they end up. Configuration comes from the
//! environment:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `LOG_FORMAT` | `json` for JSON lines, anything else for text | text |
//! | `RUST_LOG` | `EnvFilter` directives | `info` |

use std::env;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Error;

const DEFAULT_FILTER: &str = "info";

/// Output format of the process subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for development.
    Text,
    /// One JSON object per line, for log shippers.
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { format: LogFormat::Text, filter: DEFAULT_FILTER.to_owned() }
    }
}

impl TelemetryConfig {
    /// Reads `LOG_FORMAT` and `RUST_LOG`.
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("LOG_FORMAT").ok().as_deref(),
            env::var("RUST_LOG").ok().as_deref(),
        )
    }

    fn from_vars(format: Option<&str>, filter: Option<&str>) -> Self {
        let format = match format.map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FILTER)
            .to_owned();
        Self { format, filter }
    }
}

/// Installs the global subscriber.
///
/// Fails with [`Error::Filter`] on invalid filter directives, before anything
/// is installed, and with [`Error::Telemetry`] if a subscriber already is.
pub fn init(config: &TelemetryConfig) -> Result<(), Error> {
    let filter = EnvFilter::try_new(&config.filter)?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_text_and_info() {
        assert_eq!(TelemetryConfig::from_vars(None, None), TelemetryConfig::default());
    }

    #[test]
    fn json_format_is_case_insensitive() {
        let config = TelemetryConfig::from_vars(Some(" JSON "), Some("tracewire=debug"));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "tracewire=debug");
    }

    #[test]
    fn invalid_filter_is_reported_to_the_caller() {
        let config = TelemetryConfig { filter: "tracewire=loud".to_owned(), ..Default::default() };
        let err = init(&config).unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
        assert!(err.to_string().starts_with("log filter: "));
    }

    #[test]
    fn unknown_format_and_blank_filter_fall_back() {
        let config = TelemetryConfig::from_vars(Some("logfmt"), Some("  "));
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.filter, "info");
    }
}
