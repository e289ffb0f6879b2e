//! Periodic flush timers.

use super::Instance;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawn the flush timer of `instance`, ticking every `buffer_max_age`.
///
/// Returns `None` when the instance has a zero max age, which disables
/// time-based flushing.
pub fn spawn_flush_timer(
    instance: Arc<Instance>,
    token: CancellationToken,
) -> Option<JoinHandle<()>> {
    let period = instance.config().buffer_max_age;
    if period.is_zero() {
        warn!(
            "InfluxDB instance {} has buffer_max_age 0, time-based flushing disabled",
            instance.name()
        );
        return None;
    }

    Some(tokio::spawn(run_flush_timer(instance, period, token)))
}

/// Flush `instance` whenever `period` passes without any flush and the
/// buffer is non-empty. Any flush restarts the period.
pub async fn run_flush_timer(instance: Arc<Instance>, period: Duration, token: CancellationToken) {
    loop {
        let flushed = instance.flushed();
        tokio::select! {
            () = token.cancelled() => break,
            () = flushed => continue,
            () = tokio::time::sleep(period) => {
                if instance.buffer_size() == 0 {
                    continue;
                }
                debug!(
                    "InfluxDB instance {} cache age > {:?}: forcing flush",
                    instance.name(),
                    period
                );
                instance.flush();
            }
        }
    }

    debug!("Flush timer for instance {} stopped", instance.name());
}
