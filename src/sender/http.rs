use super::{PointWriter, WriteRequest, WriterError, WriterStats, WriterStatsSnapshot};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct HttpWriterConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_idle_per_host: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpWriterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_idle_per_host: 10,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: format!("influx-forwarder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Sends write requests on detached tokio tasks.
///
/// Outcomes are logged and counted, never returned.
#[derive(Debug, Clone)]
pub struct HttpWriter {
    client: Client,
    tracker: TaskTracker,
    stats: Arc<WriterStats>,
}

impl HttpWriter {
    pub fn new(config: HttpWriterConfig) -> Result<Self, WriterError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                WriterError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            tracker: TaskTracker::new(),
            stats: Arc::new(WriterStats::new()),
        })
    }

    pub fn stats(&self) -> WriterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Requests spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Send one request and wait for the response. Used by the detached
    /// delivery tasks.
    pub async fn send(client: &Client, request: &WriteRequest) -> Result<(), WriterError> {
        let response = client
            .post(request.url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| WriterError::NetworkError(e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WriterError::HttpError {
                status: status.as_u16(),
            })
        }
    }
}

impl PointWriter for HttpWriter {
    fn submit(&self, request: WriteRequest) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                "No async runtime available, dropping {} points for {}",
                request.points,
                request.target()
            );
            self.stats.record_submitted(request.points);
            self.stats.record_failure(request.points);
            return;
        };

        self.stats.record_submitted(request.points);
        let client = self.client.clone();
        let stats = self.stats.clone();

        self.tracker.spawn_on(
            async move {
                let start = Instant::now();
                match Self::send(&client, &request).await {
                    Ok(()) => {
                        stats.record_success();
                        debug!(
                            "Wrote {} points to {} in {:?}",
                            request.points,
                            request.target(),
                            start.elapsed()
                        );
                    }
                    Err(e) => {
                        stats.record_failure(request.points);
                        warn!(
                            "Write of {} points to {} failed: {}",
                            request.points,
                            request.target(),
                            e
                        );
                    }
                }
            },
            &runtime,
        );
    }

    fn close(&self, grace: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.tracker.close();
            if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
                warn!(
                    "{} writes still in flight after {:?}, abandoning them",
                    self.tracker.len(),
                    grace
                );
            }

            let stats = self.stats.snapshot();
            info!(
                "Writer closed: {} requests ({} points) submitted, {} succeeded, {} failed, {} points dropped",
                stats.submitted_requests,
                stats.submitted_points,
                stats.succeeded_requests,
                stats.failed_requests,
                stats.dropped_points
            );
        })
    }
}
