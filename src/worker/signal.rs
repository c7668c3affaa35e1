// src/worker/signal.rs

//! One-shot stop signal from the supervisor to a worker.

use std::time::Duration;

use tokio::sync::watch;

/// Writer half, owned by the supervisor. Setting it is permanent.
#[derive(Debug)]
pub struct KillSignal {
    tx: watch::Sender<bool>,
}

/// Reader half, owned by the worker.
#[derive(Debug, Clone)]
pub struct KillWatch {
    rx: watch::Receiver<bool>,
}

/// Create a fresh, unset signal pair. One pair per worker generation.
pub fn kill_signal() -> (KillSignal, KillWatch) {
    let (tx, rx) = watch::channel(false);
    (KillSignal { tx }, KillWatch { rx })
}

impl KillSignal {
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }
}

impl KillWatch {
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait up to `interval` for the signal and report whether it is set.
    ///
    /// Wakes up as soon as the signal is set. A dropped [`KillSignal`] counts
    /// as set: nobody is left to stop this worker otherwise.
    pub async fn wait_timeout(&mut self, interval: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        match tokio::time::timeout(interval, self.rx.changed()).await {
            Ok(Ok(())) => self.is_set(),
            Ok(Err(_closed)) => true,
            Err(_elapsed) => self.is_set(),
        }
    }
}
