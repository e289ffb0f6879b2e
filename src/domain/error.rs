use thiserror::Error;

/// Top-level error type for the forwarder.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::app::LoggingError),

    #[error("Writer error: {0}")]
    Writer(#[from] crate::sender::WriterError),

    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),

    #[error("No instance configured")]
    NoInstances,
}
