//! Cooperative cancellation
//!
//! A cloneable flag the control loop waits on between ticks. Triggering it
//! wakes any pending wait immediately.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared shutdown flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// Create a signal that has not been triggered
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        // The flag is a plain bool, so a poisoned lock still holds a valid value
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request shutdown and wake all waiters
    pub fn trigger(&self) {
        *self.flag() = true;
        self.inner.1.notify_all();
    }

    /// Check whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.flag()
    }

    /// Sleep for up to `timeout`, returning early on shutdown
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.flag();
        let (guard, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Trigger this signal on Ctrl-C / SIGTERM
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal");
            signal.trigger();
        })
    }
}
