use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{info, warn};

/// A shutdown signal that supports interruptible waits.
///
/// Waiting threads block on a condition variable and wake as soon as
/// [`trigger`](Self::trigger) is called, with no polling interval.
#[derive(Debug)]
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal in the non-shutdown state.
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Trigger the shutdown signal, waking all waiting threads.
    ///
    /// Returns `false` if the signal had already been triggered.
    pub fn trigger(&self) -> bool {
        // Hold the lock so a waiter cannot miss the notification between
        // its check and its wait.
        let _guard = self.mutex.lock();
        let first = !self.shutdown.swap(true, Ordering::SeqCst);
        self.condvar.notify_all();
        first
    }

    /// Check if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Block until shutdown is triggered.
    pub fn wait_forever(&self) {
        let Ok(guard) = self.mutex.lock() else {
            return;
        };
        drop(self.condvar.wait_while(guard, |_| !self.is_shutdown()));
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit status for a forced exit on the second Ctrl+C.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Route Ctrl+C to `signal`.
///
/// The first interrupt requests a clean stop. A second one exits at once,
/// which is the only way out of a connect that is still blocking.
pub fn install_ctrlc_handler(signal: Arc<ShutdownSignal>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if signal.trigger() {
            info!("Received shutdown signal, stopping... (Ctrl+C again to force)");
        } else {
            warn!("Second interrupt, exiting now");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
