use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use taxdesk_core::{RevealOptions, RevealSession, RevealStep};
use taxdesk_logging::{desk_debug, desk_trace, TARGET_REVEAL};

use crate::gate::Gate;

pub trait RevealSink: Send + Sync {
    /// Called once per tick with the text revealed so far.
    fn on_progress(&self, prefix: &str);
    /// Called exactly once, after the full text has been emitted.
    fn on_complete(&self);
}

/// Typewriter effect: shows a fixed text a few chars per tick.
///
/// Starting a new reveal cancels the one still running, so a revealer always
/// animates at most one text.
#[derive(Default)]
pub struct TypewriterRevealer {
    current: Mutex<Option<RevealHandle>>,
}

impl TypewriterRevealer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reveals `full_text`.
    ///
    /// Empty text completes immediately and non-streaming options emit the
    /// whole text at once; neither schedules a timer. Otherwise a task is
    /// spawned on the current tokio runtime.
    pub fn reveal(
        &self,
        full_text: impl Into<String>,
        options: RevealOptions,
        sink: Arc<dyn RevealSink>,
    ) -> RevealHandle {
        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            previous.cancel();
        }

        let handle = start_reveal(RevealSession::new(full_text, options), sink);
        *self.current.lock() = Some(handle.clone());
        handle
    }

    /// Cancels the current reveal, if any.
    pub fn cancel(&self) {
        let current = self.current.lock().take();
        if let Some(current) = current {
            current.cancel();
        }
    }
}

fn start_reveal(mut session: RevealSession, sink: Arc<dyn RevealSink>) -> RevealHandle {
    let gate = Gate::new();
    let running = Arc::new(AtomicBool::new(false));
    let handle = RevealHandle {
        gate: gate.clone(),
        running: running.clone(),
    };

    if session.is_complete() {
        desk_trace!(target: TARGET_REVEAL, "empty reveal completes immediately");
        gate.deliver(|| sink.on_complete());
        return handle;
    }

    if !session.options().streaming() {
        if let Some(full) = session.finish() {
            gate.deliver(|| {
                sink.on_progress(full);
                sink.on_complete();
            });
        }
        return handle;
    }

    desk_debug!(
        target: TARGET_REVEAL,
        "reveal {} chars, {} per {}ms",
        session.len(),
        session.options().chars_per_tick(),
        session.options().tick().as_millis()
    );
    running.store(true, Ordering::SeqCst);
    tokio::spawn(async move {
        let tick = session.options().tick();
        loop {
            tokio::select! {
                biased;
                _ = gate.closed() => break,
                _ = tokio::time::sleep(tick) => {}
            }
            match session.advance() {
                RevealStep::Progress(prefix) => {
                    if !gate.deliver(|| sink.on_progress(prefix)) {
                        break;
                    }
                }
                RevealStep::Completed(full) => {
                    gate.deliver(|| {
                        sink.on_progress(full);
                        sink.on_complete();
                    });
                    break;
                }
                RevealStep::Idle => break,
            }
        }
        running.store(false, Ordering::SeqCst);
    });

    handle
}

/// Caller's side of one reveal.
#[derive(Debug, Clone)]
pub struct RevealHandle {
    gate: Gate,
    running: Arc<AtomicBool>,
}

impl RevealHandle {
    /// Stops the reveal. Idempotent, safe after completion and from inside a
    /// sink callback.
    pub fn cancel(&self) {
        if self.gate.close() && self.running.swap(false, Ordering::SeqCst) {
            desk_debug!(target: TARGET_REVEAL, "reveal cancelled");
        }
    }

    /// `true` while ticks are still scheduled.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.gate.is_open()
    }
}
