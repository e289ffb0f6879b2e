use std::io;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tracing::{error, info};

/// Completes on SIGINT (Ctrl+C) or, on unix, SIGTERM.
///
/// If no signal listener can be installed this never completes; the
/// forwarder then stops at end of input only.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => {
                        if !ctrl_c_received(result) {
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating graceful shutdown");
                    }
                }
                return;
            }
            Err(err) => error!("Failed to create SIGTERM handler: {}", err),
        }
    }

    if !ctrl_c_received(signal::ctrl_c().await) {
        std::future::pending::<()>().await;
    }
}

fn ctrl_c_received(result: io::Result<()>) -> bool {
    match result {
        Ok(()) => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            true
        }
        Err(err) => {
            error!("Failed to listen for SIGINT: {}", err);
            false
        }
    }
}
