pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, InstanceConfig, LogFormat, LogLevel, Settings};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};

use crate::domain::ForwarderError;
use crate::engine::Forwarder;
use crate::sender::{HttpWriter, HttpWriterConfig};
use clap::Parser;
use std::future::Future;
use std::io::{self, BufRead, BufReader};
use std::process;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct App {
    config: Config,
    forwarder: Forwarder,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, ForwarderError> {
        info!(
            "Loading InfluxDB instance settings from {}",
            config.config_file.display()
        );
        let settings = Settings::from_file(&config.config_file)?;
        if settings.is_empty() {
            return Err(ForwarderError::NoInstances);
        }

        let writer = HttpWriter::new(HttpWriterConfig {
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            ..Default::default()
        })?;

        let forwarder =
            Forwarder::new(settings, Arc::new(writer)).with_shutdown_grace(config.shutdown_grace());
        if forwarder.instances().is_empty() {
            return Err(ForwarderError::NoInstances);
        }

        Ok(Self { config, forwarder })
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Feed events from the configured input until it ends or a shutdown
    /// signal arrives, then flush every instance.
    pub async fn run(self) -> Result<(), ForwarderError> {
        self.forwarder.start();

        let events = match &self.config.input {
            Some(path) => spawn_line_reader(BufReader::new(std::fs::File::open(path)?))?,
            None => spawn_line_reader(BufReader::new(io::stdin()))?,
        };

        info!("influx-forwarder is running. Press Ctrl+C to stop.");
        let result = pump(&self.forwarder, events, shutdown::wait_for_signal()).await;

        self.forwarder.shutdown().await;
        info!("influx-forwarder stopped.");
        result
    }
}

/// Read `reader` line by line on a dedicated thread.
///
/// Blocking reads stay off the runtime, so a reader stuck on an open stdin
/// never holds up process exit after a shutdown signal.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    thread::Builder::new()
        .name("event-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            debug!("Event reader thread finished");
        })?;
    Ok(rx)
}

/// Feed events to `forwarder` until the input ends or `shutdown` completes.
pub async fn pump<S>(
    forwarder: &Forwarder,
    mut events: mpsc::Receiver<io::Result<String>>,
    shutdown: S,
) -> Result<(), ForwarderError>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => return Ok(()),
            event = events.recv() => match event {
                Some(Ok(line)) if line.trim().is_empty() => {}
                Some(Ok(line)) => {
                    forwarder.process_event(&line);
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("Event input closed");
                    return Ok(());
                }
            },
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Prints help/version or the usage error and exits
    let config = Config::try_parse().unwrap_or_else(|e| e.exit());
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {e}");
        process::exit(2);
    }

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Warning: {e}");
    }

    info!("Starting influx-forwarder v{}", get_version());

    match App::from_config(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {}", e);
                process::exit(1);
            }
        }
        Err(ForwarderError::NoInstances) => {
            warn!("No usable InfluxDB instance configured, nothing to do");
            process::exit(1);
        }
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(1);
        }
    }

    Ok(())
}
