//! Graceful shutdown coordination.
//!
//! A single process-wide coordinator lets the signal handler request shutdown
//! and lets long-running loops poll for it between work items. Collection
//! stops at the next chunk boundary; completed work units stay checkpointed,
//! so a restarted run resumes where this one stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Notify;
use tracing::info;

static COORDINATOR: Lazy<ShutdownCoordinator> = Lazy::new(ShutdownCoordinator::new);

/// Process-wide shutdown flag with async notification.
pub struct ShutdownCoordinator {
    requested: AtomicBool,
    notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Mark shutdown as requested and wake all waiters.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested.
    pub async fn wait(&self) {
        if self.is_requested() {
            return;
        }
        self.notify.notified().await;
    }
}

/// The process-wide coordinator.
pub fn coordinator() -> &'static ShutdownCoordinator {
    &COORDINATOR
}

/// Whether shutdown has been requested anywhere in the process.
pub fn is_shutdown_requested() -> bool {
    COORDINATOR.is_requested()
}

/// Request shutdown; loops stop at their next checkpoint-safe boundary.
pub fn request_shutdown() {
    COORDINATOR.request();
}

/// Install a Ctrl-C handler that requests graceful shutdown.
///
/// A second Ctrl-C after the first exits the process immediately.
pub fn install_signal_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current chunk before exit");
            request_shutdown();
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("second interrupt, exiting immediately");
                std::process::exit(130);
            }
        }
    });
}
