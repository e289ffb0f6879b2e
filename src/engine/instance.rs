use crate::app::config::{ConfigError, InstanceConfig};
use crate::buffer::{BucketKey, PointBuffer};
use crate::domain::Point;
use crate::sender::{PointWriter, WriteRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::debug;
use url::Url;

/// One configured destination with its buffer.
///
/// The buffer is only touched under its mutex, and the lock is never held
/// across an await.
pub struct Instance {
    name: String,
    config: InstanceConfig,
    write_url: Url,
    buffer: Mutex<PointBuffer>,
    rearm: Notify,
    flushes: AtomicU64,
    writer: Arc<dyn PointWriter>,
}

impl Instance {
    pub fn new(
        name: impl Into<String>,
        config: InstanceConfig,
        writer: Arc<dyn PointWriter>,
    ) -> Result<Self, ConfigError> {
        let write_url = config.write_url()?;
        Ok(Self {
            name: name.into(),
            config,
            write_url,
            buffer: Mutex::new(PointBuffer::new()),
            rearm: Notify::new(),
            flushes: AtomicU64::new(0),
            writer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Returns the buffer size after the append.
    pub fn append(&self, key: BucketKey, point: Point) -> usize {
        self.buffer.lock().append(key, point)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.lock().size()
    }

    /// Number of flushes run so far, empty ones included.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Drain the buffer and submit one request per non-empty bucket.
    ///
    /// Restarts the periodic timer. The buffer is cleared whatever the
    /// requests' outcome. Returns the number of points handed to the writer.
    pub fn flush(&self) -> usize {
        self.rearm.notify_waiters();
        self.flushes.fetch_add(1, Ordering::Relaxed);

        let drained = self.buffer.lock().drain();
        if drained.is_empty() {
            return 0;
        }

        debug!("Flushing InfluxDB buffer for instance {}", self.name);
        let mut points = 0;
        for bucket in drained {
            let request = WriteRequest::new(&self.name, &self.write_url, &self.config, bucket);
            debug!("Sending {} points to {}", request.points, request.target());
            points += request.points;
            self.writer.submit(request);
        }
        points
    }

    /// Completes when the next flush of this instance starts.
    pub(crate) fn flushed(&self) -> Notified<'_> {
        self.rearm.notified()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("endpoint", &self.config.endpoint())
            .field("buffer_size", &self.buffer_size())
            .field("flushes", &self.flush_count())
            .finish()
    }
}
