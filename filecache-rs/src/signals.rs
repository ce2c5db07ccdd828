//! Installs a signal handler which terminates the platform on CTRL+C or SIGHUP.
//!
//! Forks an async task on the scheduler which waits for either **CTRL+C** or **SIGHUP** and then
//! invokes [Platform::terminate](crate::platform::Platform::terminate) on the given platform.
use std::sync::Arc;

use tokio::signal::unix::SignalKind;

use crate::platform::Platform;

/// Installs a signal handler for the given platform which awaits either a **CTRL+C** or **SIGHUP**.
///
/// Note that this is automatically called by the [Builder](crate::builder::Builder) unless it is
/// disabled.
pub fn install(platform: &Arc<Platform>) {
    let weak_platform = Arc::downgrade(platform);
    let task = platform.scheduler().spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sig_hup = match tokio::signal::unix::signal(SignalKind::hangup()) {
            Ok(signal) => signal,
            Err(error) => {
                log::error!("Cannot install the signal handler: {}", error);
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c => {
                log::info!("Received CTRL-C. Shutting down...");
            },
            _ = sig_hup.recv() => {
                log::info!("Received SIGHUP. Shutting down...");
            }
        }

        if let Some(platform) = weak_platform.upgrade() {
            platform.terminate();
        }
    });

    if task.is_none() {
        log::warn!("Cannot install the signal handler as the scheduler has already been stopped.");
    }
}
