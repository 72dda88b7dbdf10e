//! Shutdown registrars.
//!
//! - **OsSignalRegistrar**: runs the handler on SIGINT / SIGTERM / SIGQUIT
//!   (Ctrl-C on other platforms) and then reports termination
//! - **ManualShutdown**: keeps the handler until `trigger()` is called; for
//!   tests and hosts that own their own exit path

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ports::{ShutdownHandler, ShutdownRegistrar};

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Waits for a termination signal, runs every registered handler to
/// completion, then flips `terminated()`.
pub struct OsSignalRegistrar {
    handle: Handle,
    done_tx: Arc<watch::Sender<bool>>,
}

impl OsSignalRegistrar {
    pub fn new(handle: Handle) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            handle,
            done_tx: Arc::new(done_tx),
        }
    }

    /// Resolves once a signal arrived and the handlers finished draining.
    pub fn terminated(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.done_tx.subscribe();
        Box::pin(async move {
            // the sender lives as long as the registrar's signal task
            let _ = rx.wait_for(|done| *done).await;
        })
    }
}

impl ShutdownRegistrar for OsSignalRegistrar {
    fn on_shutdown(&self, handler: ShutdownHandler) {
        let done_tx = Arc::clone(&self.done_tx);
        self.handle.spawn(async move {
            if let Err(e) = wait_for_shutdown_signal().await {
                warn!(error = %e, "cannot listen for shutdown signals");
                return;
            }
            info!("shutdown signal received, draining");
            handler().await;
            done_tx.send_replace(true);
        });
    }
}

/// Holds registered handlers until [`trigger`](Self::trigger).
#[derive(Default)]
pub struct ManualShutdown {
    handlers: Mutex<Vec<ShutdownHandler>>,
    registered: Mutex<usize>,
}

impl ManualShutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many handlers were ever registered.
    pub fn registrations(&self) -> usize {
        *self.registered.lock()
    }

    /// Runs every pending handler and waits for all of them to drain.
    ///
    /// Calling the handler happens before the first await, so the center is
    /// already `Exiting` (or `Exited`) when this future is first polled.
    pub fn trigger(&self) -> BoxFuture<'static, ()> {
        let handlers = std::mem::take(&mut *self.handlers.lock());
        let drains: Vec<_> = handlers.into_iter().map(|h| h()).collect();
        Box::pin(async move {
            futures::future::join_all(drains).await;
        })
    }
}

impl ShutdownRegistrar for ManualShutdown {
    fn on_shutdown(&self, handler: ShutdownHandler) {
        self.handlers.lock().push(handler);
        *self.registered.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn manual_trigger_runs_handlers_once() {
        let shutdown = ManualShutdown::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        shutdown.on_shutdown(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        }));

        assert_eq!(shutdown.registrations(), 1);
        shutdown.trigger().await;
        shutdown.trigger().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trigger_invokes_handler_before_first_poll() {
        let shutdown = ManualShutdown::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        shutdown.on_shutdown(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        }));

        let drain = shutdown.trigger();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        drain.await;
    }
}
