use std::sync::Arc;
use std::time::Duration;

use taxdesk_core::{
    JobResource, WatchError, WatchEvent, WatchOptions, WatchSession, WatchStatus, WatchStep,
};
use taxdesk_logging::{desk_debug, desk_info, desk_trace, desk_warn, TARGET_WATCH};
use tokio::sync::watch;

use crate::fetch::ResourceFetcher;
use crate::gate::Gate;

/// Receives every transition of one watch session, in order.
pub trait WatchSink<T>: Send + Sync {
    fn on_event(&self, event: WatchEvent<T>);
}

impl<T, F> WatchSink<T> for F
where
    F: Fn(WatchEvent<T>) + Send + Sync,
{
    fn on_event(&self, event: WatchEvent<T>) {
        self(event)
    }
}

/// Observable state of a watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState<T> {
    pub resource: JobResource<T>,
    pub status: WatchStatus,
    pub attempts_made: u32,
    pub last_error: Option<WatchError>,
}

impl<T: Clone> WatchState<T> {
    fn of(session: &WatchSession<T>) -> Self {
        Self {
            resource: session.resource().clone(),
            status: session.status(),
            attempts_made: session.attempts_made(),
            last_error: session.last_error().cloned(),
        }
    }
}

/// Polls a job until it has a result, runs out of attempts, or a fetch
/// fails. One fetch at a time: the next delay starts only once the previous
/// fetch has settled.
pub struct PollingJobWatcher<T> {
    fetcher: Arc<dyn ResourceFetcher<T>>,
}

impl<T> PollingJobWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(fetcher: Arc<dyn ResourceFetcher<T>>) -> Self {
        Self { fetcher }
    }

    /// Starts watching `initial.id`.
    ///
    /// A snapshot that already has a result is reported as `Succeeded`
    /// before this returns and no request is made. Otherwise a task is
    /// spawned on the current tokio runtime.
    pub fn start(
        &self,
        token: impl Into<String>,
        initial: JobResource<T>,
        options: WatchOptions,
        sink: Arc<dyn WatchSink<T>>,
    ) -> WatchHandle<T> {
        let (session, step) = WatchSession::start(initial, options);
        let gate = Gate::new();
        let (state_tx, state_rx) = watch::channel(WatchState::of(&session));
        let state_tx = Arc::new(state_tx);
        let handle = WatchHandle {
            gate: gate.clone(),
            state_tx: state_tx.clone(),
            state_rx,
        };

        match step {
            WatchStep::Finished(event) => {
                desk_info!(target: TARGET_WATCH, "watch {} already resolved", session.id());
                gate.deliver(|| sink.on_event(event));
            }
            WatchStep::Continue {
                attempts_made,
                delay,
            } => {
                desk_info!(
                    target: TARGET_WATCH,
                    "watch {} started interval_ms={} max_attempts={}",
                    session.id(),
                    options.interval().as_millis(),
                    options.max_attempts()
                );
                gate.deliver(|| sink.on_event(WatchEvent::Polling { attempts_made }));
                tokio::spawn(poll_until_settled(
                    self.fetcher.clone(),
                    token.into(),
                    session,
                    delay,
                    gate,
                    sink,
                    state_tx,
                ));
            }
            WatchStep::Ignored => {}
        }

        handle
    }
}

async fn poll_until_settled<T>(
    fetcher: Arc<dyn ResourceFetcher<T>>,
    token: String,
    mut session: WatchSession<T>,
    mut delay: Duration,
    gate: Gate,
    sink: Arc<dyn WatchSink<T>>,
    state_tx: Arc<watch::Sender<WatchState<T>>>,
) where
    T: Clone + Send + Sync + 'static,
{
    let id = session.id().clone();
    loop {
        tokio::select! {
            biased;
            _ = gate.closed() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        desk_trace!(
            target: TARGET_WATCH,
            "watch {} fetch #{}",
            id,
            session.attempts_made() + 1
        );
        let fetched = tokio::select! {
            biased;
            _ = gate.closed() => {
                desk_debug!(target: TARGET_WATCH, "watch {} cancelled with fetch in flight", id);
                break;
            }
            fetched = fetcher.fetch(&token, &id) => fetched,
        };

        let step = match fetched {
            Ok(found) => session.on_fetched(found),
            Err(err) => {
                desk_warn!(target: TARGET_WATCH, "watch {} fetch failed: {}", id, err);
                session.on_fetch_failed(WatchError::fetch(err.to_string()))
            }
        };
        let state = WatchState::of(&session);

        match step {
            WatchStep::Continue {
                attempts_made,
                delay: next,
            } => {
                let delivered = gate.deliver(|| {
                    state_tx.send_replace(state);
                    sink.on_event(WatchEvent::Polling { attempts_made });
                });
                if !delivered {
                    break;
                }
                delay = next;
            }
            WatchStep::Finished(event) => {
                desk_info!(
                    target: TARGET_WATCH,
                    "watch {} finished status={:?} attempts={}",
                    id,
                    session.status(),
                    session.attempts_made()
                );
                gate.deliver(|| {
                    state_tx.send_replace(state);
                    sink.on_event(event);
                });
                break;
            }
            WatchStep::Ignored => break,
        }
    }
}

/// Caller's side of a watch session.
///
/// Dropping a handle does not stop polling; call [`WatchHandle::cancel`].
#[derive(Clone)]
pub struct WatchHandle<T> {
    gate: Gate,
    state_tx: Arc<watch::Sender<WatchState<T>>>,
    state_rx: watch::Receiver<WatchState<T>>,
}

impl<T: Clone> WatchHandle<T> {
    pub fn status(&self) -> WatchStatus {
        self.state_rx.borrow().status
    }

    pub fn is_polling(&self) -> bool {
        self.status() == WatchStatus::Polling
    }

    pub fn resource(&self) -> JobResource<T> {
        self.state_rx.borrow().resource.clone()
    }

    pub fn attempts_made(&self) -> u32 {
        self.state_rx.borrow().attempts_made
    }

    pub fn last_error(&self) -> Option<WatchError> {
        self.state_rx.borrow().last_error.clone()
    }

    pub fn state(&self) -> WatchState<T> {
        self.state_rx.borrow().clone()
    }

    /// Receiver that changes whenever the session publishes new state.
    pub fn subscribe(&self) -> watch::Receiver<WatchState<T>> {
        self.state_rx.clone()
    }

    /// Stops the session. Idempotent and safe from inside a sink callback;
    /// once it returns the sink sees nothing more, not even the result of a
    /// fetch already in flight. A session that already finished keeps its
    /// terminal status.
    pub fn cancel(&self) {
        if !self.gate.close() {
            return;
        }
        self.state_tx.send_modify(|state| {
            if !state.status.is_terminal() {
                state.status = WatchStatus::Cancelled;
            }
        });
        desk_debug!(
            target: TARGET_WATCH,
            "watch {} cancel requested",
            self.state_rx.borrow().resource.id
        );
    }
}
