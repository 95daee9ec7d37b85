use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, Semaphore, SemaphorePermit};

/// Suggestion budget with a fast lane
///
/// Retries for the candidate in front of the reviewer take the next free
/// slot ahead of background suggestions already queued. The budget itself
/// is never exceeded.
#[derive(Debug)]
pub struct SuggestionGate {
    permits: Semaphore,
    priority_waiting: AtomicUsize,
    priority_done: Notify,
}

struct PriorityTicket<'a>(&'a SuggestionGate);

impl Drop for PriorityTicket<'_> {
    fn drop(&mut self) {
        self.0.priority_waiting.fetch_sub(1, Ordering::SeqCst);
        self.0.priority_done.notify_waiters();
    }
}

impl SuggestionGate {
    pub fn new(budget: usize) -> Self {
        Self {
            permits: Semaphore::new(budget),
            priority_waiting: AtomicUsize::new(0),
            priority_done: Notify::new(),
        }
    }

    /// Wait for a slot; `None` only if the gate was closed
    pub async fn acquire(&self, priority: bool) -> Option<SemaphorePermit<'_>> {
        if priority {
            self.priority_waiting.fetch_add(1, Ordering::SeqCst);
            let _ticket = PriorityTicket(self);
            return self.permits.acquire().await.ok();
        }

        loop {
            self.wait_for_priority_lane().await;
            let permit = self.permits.acquire().await.ok()?;
            if self.priority_waiting.load(Ordering::SeqCst) == 0 {
                return Some(permit);
            }
            // A retry is waiting; hand the slot over and queue again
            drop(permit);
        }
    }

    async fn wait_for_priority_lane(&self) {
        loop {
            let notified = self.priority_done.notified();
            if self.priority_waiting.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
