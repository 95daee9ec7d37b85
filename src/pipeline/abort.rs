use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortInner {
    flag: AtomicBool,
    notify: Notify,
}

/// Run-wide interrupt, shared by the driver and every in-flight task
///
/// Once set it stays set; a new run gets a new signal.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AbortInner>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.flag.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `abort` has been called
    pub async fn aborted(&self) {
        loop {
            // Register before checking so a concurrent abort is not missed
            let notified = self.0.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}
