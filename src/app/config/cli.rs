use super::{ConfigError, LogFormat, LogLevel};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Instance settings file (TOML, or JSON with a .json extension)
    #[arg(long, short = 'c', env = "INFLUX_FORWARDER_CONFIG", default_value = "influx-forwarder.toml")]
    pub config_file: PathBuf,

    /// Read events from this file instead of stdin (one JSON event per line)
    #[arg(long, env = "INFLUX_FORWARDER_INPUT")]
    pub input: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Per-request timeout for writes, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Connection timeout for writes, in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// How long shutdown waits for in-flight writes, in seconds
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "5")]
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("influx-forwarder.toml"),
            input: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
