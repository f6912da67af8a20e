//! Graceful shutdown handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `shutdown` on the first Ctrl-C.
///
/// If the signal handler cannot be installed the token is left alone and
/// callers keep running until something else cancels it.
pub fn cancel_on_ctrl_c(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    log::info!("Shutdown requested, stopping live updates");
                    shutdown.cancel();
                }
                Err(e) => log::warn!("Unable to listen for Ctrl-C: {}", e),
            },
        }
    })
}
