//! Delivery of flushed buckets to InfluxDB.
//!
//! `PointWriter::submit` is fire-and-forget: the caller never learns whether
//! a request succeeded, and a failed request drops its points.

pub mod http;
pub mod memory;
pub mod stats;

use crate::app::config::InstanceConfig;
use crate::buffer::DrainedBucket;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use http::{HttpWriter, HttpWriterConfig};
pub use memory::MemoryWriter;
pub use stats::{WriterStats, WriterStatsSnapshot};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Carries no request URL, since the URL holds the credentials.
    #[error("Network error: {0}")]
    NetworkError(reqwest::Error),
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },
}

/// One `/write` call: the points of a single `(database, precision)` bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub instance: String,
    pub url: Url,
    pub database: Option<String>,
    pub precision: Option<String>,
    pub body: String,
    pub points: usize,
}

impl WriteRequest {
    /// Build the request for `bucket`. `write_url` is the instance's `/write`
    /// URL; unset values are sent as empty query parameters.
    pub fn new(
        instance: &str,
        write_url: &Url,
        config: &InstanceConfig,
        bucket: DrainedBucket,
    ) -> Self {
        let mut url = write_url.clone();
        url.query_pairs_mut()
            .append_pair("db", bucket.key.database.as_deref().unwrap_or_default())
            .append_pair("precision", bucket.key.precision.as_deref().unwrap_or_default())
            .append_pair("u", config.username.as_deref().unwrap_or_default())
            .append_pair("p", config.password.as_deref().unwrap_or_default());

        let body = bucket.body();
        Self {
            instance: instance.to_string(),
            url,
            points: bucket.points.len(),
            database: bucket.key.database,
            precision: bucket.key.precision,
            body,
        }
    }

    /// Log-safe description of the destination (no credentials).
    pub fn target(&self) -> String {
        format!(
            "instance={} db={} precision={}",
            self.instance,
            self.database.as_deref().unwrap_or("<unset>"),
            self.precision.as_deref().unwrap_or("<unset>")
        )
    }
}

/// Sink for write requests.
pub trait PointWriter: Send + Sync {
    /// Hand off a request for delivery. Must not block and must not report
    /// the outcome back to the caller.
    fn submit(&self, request: WriteRequest);

    /// Wait up to `grace` for requests still in flight.
    fn close(&self, _grace: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}
