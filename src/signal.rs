//! One-shot broadcast signal.
//!
//! Used for the completion signal a sink raises towards its producers and for
//! the reset signal that stops a relay's send loop. Firing wakes every current
//! and future waiter. Firing twice is a contract violation and panics.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Signal {
    fired: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal, releasing every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the signal has already been fired.
    pub fn fire(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            panic!("signal fired more than once");
        }
        self.notify.notify_waiters();
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Resolve once the signal has fired (immediately if it already has).
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent fire is not missed
        notified.as_mut().enable();
        if self.is_fired() {
            return;
        }
        notified.await;
    }
}
