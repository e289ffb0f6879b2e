//! Event ingestion and the flush path.
//!
//! A `Forwarder` owns one `Instance` per configured destination. Ingestion
//! appends points to every instance and flushes inline when an instance
//! reaches its size threshold; a per-instance timer flushes stale buffers.

mod instance;
pub mod scheduler;

pub use instance::Instance;

use crate::app::config::Settings;
use crate::buffer::BucketKey;
use crate::codec::{self, merge_tags};
use crate::domain::{Point, RawEvent};
use crate::sender::PointWriter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Result reported back to the host for every event: always empty output and
/// status 0, whatever happened to the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub output: String,
    pub status: i32,
}

impl Completion {
    pub fn ok() -> Self {
        Self {
            output: String::new(),
            status: 0,
        }
    }
}

pub struct Forwarder {
    instances: Vec<Arc<Instance>>,
    writer: Arc<dyn PointWriter>,
    shutdown_token: CancellationToken,
    shutdown_grace: Duration,
}

impl Forwarder {
    /// Build one instance per configured destination and log its summary.
    pub fn new(settings: Settings, writer: Arc<dyn PointWriter>) -> Self {
        let mut instances = Vec::with_capacity(settings.len());
        for (name, config) in settings.into_instances() {
            match Instance::new(name.clone(), config, writer.clone()) {
                Ok(instance) => {
                    info!(
                        "InfluxDB instance {} initialized at {} - defaults: db={} precision={}",
                        instance.name(),
                        instance.config().endpoint(),
                        instance.config().database.as_deref().unwrap_or("<unset>"),
                        instance.config().time_precision
                    );
                    info!(
                        "InfluxDB instance {} write buffer: flushed every {} points or every {:?}",
                        instance.name(),
                        instance.config().buffer_max_size,
                        instance.config().buffer_max_age
                    );
                    instances.push(Arc::new(instance));
                }
                Err(e) => error!("Skipping InfluxDB instance {}: {}", name, e),
            }
        }

        Self {
            instances,
            writer,
            shutdown_token: CancellationToken::new(),
            shutdown_grace: Duration::from_secs(5),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Spawn the periodic flush timer of every instance. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) {
        for instance in &self.instances {
            scheduler::spawn_flush_timer(instance.clone(), self.shutdown_token.child_token());
        }
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&Arc<Instance>> {
        self.instances.iter().find(|i| i.name() == name)
    }

    /// Buffered points of `name`, `0` for an unknown instance.
    pub fn buffer_size(&self, name: &str) -> usize {
        self.instance(name).map_or(0, |i| i.buffer_size())
    }

    /// Ingest one raw event payload.
    ///
    /// A payload that fails to decode is logged and dropped for every
    /// instance. The completion is always a success.
    pub fn process_event(&self, payload: &str) -> Completion {
        let event = match RawEvent::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                error!("Failed to parse event data: {}", e);
                return Completion::ok();
            }
        };

        for instance in &self.instances {
            self.ingest(instance, &event);
        }

        Completion::ok()
    }

    fn ingest(&self, instance: &Instance, event: &RawEvent) {
        let config = instance.config();
        let client = event.client_name();
        let bucket = BucketKey::new(
            event.database(config.database.as_deref()),
            event.time_precision(Some(config.time_precision.as_str())),
        );
        let tags = merge_tags(&config.tags, &event.check_tags(), client);

        let mut appended = 0usize;
        for line in event.output_lines() {
            let Some(parsed) = codec::parse_line(line, client, &config.strip_metric) else {
                continue;
            };

            let series = tags.append_to(&parsed.key);
            let point = Point::new(&series, parsed.value, event.check.duration, parsed.timestamp);
            appended += 1;

            if instance.append(bucket.clone(), point) >= config.buffer_max_size {
                debug!(
                    "InfluxDB instance {} reached {} points, flushing",
                    instance.name(),
                    config.buffer_max_size
                );
                instance.flush();
            }
        }

        debug!(
            "Buffered {} points from {} for instance {}",
            appended,
            client,
            instance.name()
        );
    }

    /// Stop the timers, flush every instance once and give in-flight writes
    /// up to the shutdown grace to finish. Always returns `true`.
    pub async fn shutdown(&self) -> bool {
        self.shutdown_token.cancel();

        for instance in &self.instances {
            info!(
                "Flushing InfluxDB buffer before exiting for instance {}",
                instance.name()
            );
            instance.flush();
        }

        self.writer.close(self.shutdown_grace).await;
        true
    }
}
