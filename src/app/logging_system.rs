use super::config::{LogFormat, LogLevel};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Failed to set global tracing subscriber: {0}")]
    InitFailed(String),
}

/// Builds the tracing subscriber: a base level plus per-target directives.
#[derive(Debug, Clone)]
pub struct LoggingSystem {
    level: LogLevel,
    format: LogFormat,
    directives: Vec<String>,
}

impl LoggingSystem {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            directives: Vec::new(),
        }
    }

    /// Add a `target=level` directive. Malformed directives are skipped.
    pub fn add_directive(&mut self, directive: &str) -> &mut Self {
        match directive.split_once('=') {
            Some((target, level)) if !target.is_empty() && !level.is_empty() => {
                self.directives.push(directive.to_string());
            }
            _ => eprintln!("Warning: invalid log directive '{directive}', skipping"),
        }
        self
    }

    /// Keep the HTTP stack quiet unless asked otherwise.
    pub fn add_default_directives(&mut self) -> &mut Self {
        for directive in ["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn", "rustls=warn"] {
            self.add_directive(directive);
        }
        self
    }

    pub fn build_filter_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.directives.len() + 1);
        parts.push(self.level.as_str().to_string());
        parts.extend(self.directives.iter().cloned());
        parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }

    /// Install the global subscriber. `RUST_LOG`, when set, replaces the
    /// built filter.
    pub fn init(&self) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string();
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&filter_string).map_err(|e| {
                LoggingError::InvalidFilter {
                    filter: filter_string.clone(),
                    reason: e.to_string(),
                }
            })?,
        };

        let result = match self.format {
            LogFormat::Text => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        result.map_err(|e| LoggingError::InitFailed(e.to_string()))
    }
}

/// Install the global subscriber with the default directives.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    let mut logging_system = LoggingSystem::new(level, format);
    logging_system.add_default_directives();
    logging_system.init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string_without_directives() {
        let logging_system = LoggingSystem::new(LogLevel::Info, LogFormat::Text);
        assert_eq!(logging_system.build_filter_string(), "info");
    }

    #[test]
    fn test_default_directives() {
        let mut logging_system = LoggingSystem::new(LogLevel::Debug, LogFormat::Json);
        logging_system.add_default_directives();

        let filter = logging_system.build_filter_string();
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
        assert_eq!(logging_system.directive_count(), 5);
    }

    #[test]
    fn test_invalid_directives_skipped() {
        let mut logging_system = LoggingSystem::new(LogLevel::Info, LogFormat::Text);
        logging_system
            .add_directive("influx_forwarder=trace")
            .add_directive("no_level")
            .add_directive("=warn")
            .add_directive("");
        assert_eq!(logging_system.directive_count(), 1);
        assert_eq!(
            logging_system.build_filter_string(),
            "info,influx_forwarder=trace"
        );
    }
}
