//! Out-of-band abort signal
//!
//! An [`AbortHandle`] raises the signal, any number of [`AbortSignal`]s
//! observe it. Dropping every handle counts as an abort, so a job whose
//! controller went away stops instead of running unattended.

use std::sync::Arc;
use tokio::sync::watch;

/// Creates a connected abort handle and signal
#[must_use]
pub fn abort_channel() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}

/// Raises the abort signal
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Asks every observer to stop as soon as possible
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true if the signal was raised
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a new observer of this handle
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes an abort handle
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Returns true if the signal was raised or its handles are gone
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Completes once the signal is raised or the channel closes
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Derives a child channel that fires when this one fires
    ///
    /// The child can also be raised on its own, without touching the parent.
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn child(&self) -> (AbortHandle, AbortSignal) {
        let (handle, signal) = abort_channel();
        let parent = self.clone();
        let forward = Arc::clone(&handle.tx);
        tokio::spawn(async move {
            tokio::select! {
                () = parent.aborted() => {
                    forward.send_replace(true);
                }
                () = forward.closed() => {}
            }
        });
        (handle, signal)
    }
}
