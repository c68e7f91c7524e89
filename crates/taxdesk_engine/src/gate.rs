use std::cell::Cell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Delivery gate shared by a session task and its handle.
///
/// Callbacks run while the gate is held, and closing takes the same lock, so
/// once `close` returns no callback can start. The lock is reentrant: a
/// callback may close its own gate.
#[derive(Debug, Clone)]
pub(crate) struct Gate {
    open: Arc<ReentrantMutex<Cell<bool>>>,
    cancel: CancellationToken,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            open: Arc::new(ReentrantMutex::new(Cell::new(true))),
            cancel: CancellationToken::new(),
        }
    }

    /// Runs `deliver` if the gate is still open. Returns `false` when closed.
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let open = self.open.lock();
        if !open.get() {
            return false;
        }
        deliver();
        true
    }

    /// Closes the gate and wakes the task. Returns `true` on the first call.
    pub(crate) fn close(&self) -> bool {
        let was_open = {
            let open = self.open.lock();
            open.replace(false)
        };
        self.cancel.cancel();
        was_open
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.lock().get()
    }

    pub(crate) fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}
