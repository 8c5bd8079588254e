//! Cooperative shutdown signal shared by the poller and recovery watchers.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Sending half; triggering it stops every task holding a [`Shutdown`]
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left.
        self.tx.send_replace(true);
    }
}

/// Receiving half, cloned into each task
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a linked trigger/receiver pair
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `duration`, returning `true` if shutdown was requested first.
    ///
    /// A dropped trigger counts as shutdown.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            changed = self.rx.changed() => changed.is_err() || *self.rx.borrow(),
        }
    }

    /// Wait until shutdown is requested
    pub async fn wait(&mut self) {
        while !self.is_shutdown() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Resolve on Ctrl-C or SIGTERM
///
/// If no handler can be installed this never resolves, so a missing
/// signal source cannot stop monitoring.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = until_signalled(tokio::signal::ctrl_c()) => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                until_signalled(tokio::signal::ctrl_c()).await;
            }
        }
    }

    #[cfg(not(unix))]
    until_signalled(tokio::signal::ctrl_c()).await;
}

async fn until_signalled<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_trigger() {
        let (_trigger, mut shutdown) = channel();
        assert!(!shutdown.sleep(Duration::from_secs(30)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_interrupts_sleep() {
        let (trigger, mut shutdown) = channel();
        let task = tokio::spawn(async move { shutdown.sleep(Duration::from_secs(3600)).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();

        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_trigger_counts_as_shutdown() {
        let (trigger, mut shutdown) = channel();
        drop(trigger);
        assert!(shutdown.sleep(Duration::from_secs(3600)).await);
        shutdown.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_listener_error_never_resolves() {
        let failing = async { Err(std::io::Error::other("no signal driver")) };
        let waited = tokio::time::timeout(Duration::from_secs(3600), until_signalled(failing)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_delivered_signal_resolves() {
        until_signalled(async { Ok(()) }).await;
    }
}
