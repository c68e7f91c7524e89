use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use taxdesk_core::{JobId, JobResource, WatchError, WatchEvent, WatchOptions, WatchStatus};
use taxdesk_engine::{FailureKind, FetchError, PollingJobWatcher, ResourceFetcher, WatchHandle};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

type Reply = Result<Option<JobResource<String>>, FetchError>;

fn job_id() -> JobId {
    JobId::new("chat-1").unwrap()
}

fn pending() -> JobResource<String> {
    JobResource::pending(job_id())
}

fn resolved(text: &str) -> JobResource<String> {
    JobResource::resolved(job_id(), text.to_string())
}

fn options(max_attempts: u32) -> WatchOptions {
    WatchOptions::new(Duration::from_millis(1500), max_attempts).unwrap()
}

/// Answers from a script; once the script runs dry it keeps saying "pending".
#[derive(Default)]
struct ScriptedFetcher {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    started_at: Mutex<Vec<Instant>>,
}

impl ScriptedFetcher {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ResourceFetcher<String> for ScriptedFetcher {
    async fn fetch(&self, token: &str, id: &JobId) -> Reply {
        assert_eq!(token, "tok");
        assert_eq!(id.as_str(), "chat-1");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started_at.lock().unwrap().push(Instant::now());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(pending())))
    }
}

fn start(
    fetcher: Arc<ScriptedFetcher>,
    initial: JobResource<String>,
    options: WatchOptions,
) -> (WatchHandle<String>, mpsc::UnboundedReceiver<WatchEvent<String>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = PollingJobWatcher::<String>::new(fetcher);
    let handle = watcher.start(
        "tok",
        initial,
        options,
        Arc::new(move |event: WatchEvent<String>| {
            let _ = tx.send(event);
        }),
    );
    (handle, rx)
}

async fn collect_until_terminal(
    rx: &mut mpsc::UnboundedReceiver<WatchEvent<String>>,
) -> Vec<WatchEvent<String>> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = !matches!(event, WatchEvent::Polling { .. });
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

/// The paused clock lands on millisecond ticks, so allow a little slack.
fn assert_near(actual: Duration, expected: Duration) {
    let slack = Duration::from_millis(5);
    assert!(
        actual >= expected && actual <= expected + slack,
        "expected about {expected:?}, got {actual:?}"
    );
}

fn drain(rx: &mut mpsc::UnboundedReceiver<WatchEvent<String>>) -> Vec<WatchEvent<String>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn resolved_snapshot_succeeds_without_fetching() {
    let fetcher = ScriptedFetcher::new(Vec::new());
    let (handle, mut rx) = start(fetcher.clone(), resolved("done"), options(3));

    // Reported before `start` returned.
    assert_eq!(drain(&mut rx), vec![WatchEvent::Succeeded(resolved("done"))]);
    assert_eq!(handle.status(), WatchStatus::Succeeded);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausts_after_exactly_max_attempts() {
    let fetcher = ScriptedFetcher::new(Vec::new());
    let (handle, mut rx) = start(fetcher.clone(), pending(), options(3));

    let events = collect_until_terminal(&mut rx).await;
    assert_eq!(
        events,
        vec![
            WatchEvent::Polling { attempts_made: 0 },
            WatchEvent::Polling { attempts_made: 1 },
            WatchEvent::Polling { attempts_made: 2 },
            WatchEvent::Exhausted { attempts_made: 3 },
        ]
    );
    assert_eq!(handle.status(), WatchStatus::Exhausted);
    assert!(handle.last_error().is_none());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.calls(), 3);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_kth_attempt_with_kth_snapshot() {
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Some(pending())),
        Ok(Some(pending())),
        Ok(Some(resolved("third time lucky"))),
    ]);
    let (handle, mut rx) = start(fetcher.clone(), pending(), options(10));

    let events = collect_until_terminal(&mut rx).await;
    assert_eq!(
        events.last(),
        Some(&WatchEvent::Succeeded(resolved("third time lucky")))
    );
    assert_eq!(handle.status(), WatchStatus::Succeeded);
    assert_eq!(handle.resource(), resolved("third time lucky"));
    assert_eq!(handle.attempts_made(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_is_terminal() {
    let fetcher = ScriptedFetcher::new(vec![Err(FetchError::new(
        FailureKind::Network,
        "connection reset",
    ))]);
    let (handle, mut rx) = start(fetcher.clone(), pending(), options(10));

    let events = collect_until_terminal(&mut rx).await;
    let expected = WatchError::fetch("network error: connection reset");
    assert_eq!(events.last(), Some(&WatchEvent::Failed(expected.clone())));
    assert_eq!(handle.status(), WatchStatus::Failed);
    assert_eq!(handle.last_error(), Some(expected));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_resource_reports_not_found() {
    let fetcher = ScriptedFetcher::new(vec![Ok(None)]);
    let (handle, mut rx) = start(fetcher.clone(), pending(), options(10));

    let events = collect_until_terminal(&mut rx).await;
    assert_eq!(events.last(), Some(&WatchEvent::Failed(WatchError::NotFound)));
    assert_eq!(handle.last_error(), Some(WatchError::NotFound));
}

#[tokio::test(start_paused = true)]
async fn waits_one_interval_between_settled_fetches() {
    let fetcher = ScriptedFetcher::new(Vec::new());
    let began = Instant::now();
    let (_handle, mut rx) = start(fetcher.clone(), pending(), options(3));
    collect_until_terminal(&mut rx).await;

    let offsets: Vec<_> = fetcher
        .started_at
        .lock()
        .unwrap()
        .iter()
        .map(|at| at.duration_since(began))
        .collect();
    assert_eq!(offsets.len(), 3);
    for (offset, expected_ms) in offsets.iter().zip([1500, 3000, 4500]) {
        assert_near(*offset, Duration::from_millis(expected_ms));
    }
}

/// Takes longer than the poll interval and records how many calls overlap.
#[derive(Default)]
struct SlowFetcher {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started_at: Mutex<Vec<Instant>>,
}

#[async_trait::async_trait]
impl ResourceFetcher<String> for SlowFetcher {
    async fn fetch(&self, _token: &str, _id: &JobId) -> Reply {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started_at.lock().unwrap().push(Instant::now());
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(pending()))
    }
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_never_overlap() {
    let fetcher = Arc::new(SlowFetcher::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = PollingJobWatcher::<String>::new(fetcher.clone());
    let options = WatchOptions::new(Duration::from_secs(1), 3).unwrap();
    let _handle = watcher.start(
        "tok",
        pending(),
        options,
        Arc::new(move |event: WatchEvent<String>| {
            let _ = tx.send(event);
        }),
    );

    collect_until_terminal(&mut rx).await;
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

    let starts = fetcher.started_at.lock().unwrap().clone();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        assert_near(pair[1] - pair[0], Duration::from_secs(6));
    }
}

/// Blocks inside `fetch` until the test releases it.
struct GatedFetcher {
    started: mpsc::UnboundedSender<()>,
    release: Mutex<Option<oneshot::Receiver<Reply>>>,
}

#[async_trait::async_trait]
impl ResourceFetcher<String> for GatedFetcher {
    async fn fetch(&self, _token: &str, _id: &JobId) -> Reply {
        let _ = self.started.send(());
        let release = self.release.lock().unwrap().take().expect("single fetch");
        release.await.unwrap_or_else(|_| Ok(Some(pending())))
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_in_flight_result() {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = oneshot::channel();
    let fetcher = Arc::new(GatedFetcher {
        started: started_tx,
        release: Mutex::new(Some(release_rx)),
    });
    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = PollingJobWatcher::<String>::new(fetcher);
    let handle = watcher.start(
        "tok",
        pending(),
        options(5),
        Arc::new(move |event: WatchEvent<String>| {
            let _ = tx.send(event);
        }),
    );

    started_rx.recv().await.expect("fetch started");
    handle.cancel();
    // The watcher may already have dropped its receiver; either way the
    // answer must never surface.
    let _ = release_tx.send(Ok(Some(resolved("too late"))));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(drain(&mut rx), vec![WatchEvent::Polling { attempts_made: 0 }]);
    assert_eq!(handle.status(), WatchStatus::Cancelled);

    handle.cancel();
    assert_eq!(handle.status(), WatchStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_from_inside_the_sink_stops_further_events() {
    let fetcher = ScriptedFetcher::new(Vec::new());
    let watcher = PollingJobWatcher::<String>::new(fetcher.clone());
    let slot: Arc<Mutex<Option<WatchHandle<String>>>> = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink_slot = slot.clone();
    let sink_seen = seen.clone();
    let handle = watcher.start(
        "tok",
        pending(),
        options(10),
        Arc::new(move |event: WatchEvent<String>| {
            let stop = event == WatchEvent::Polling { attempts_made: 1 };
            sink_seen.lock().unwrap().push(event);
            if stop {
                if let Some(handle) = sink_slot.lock().unwrap().as_ref() {
                    handle.cancel();
                }
            }
        }),
    );
    *slot.lock().unwrap() = Some(handle.clone());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            WatchEvent::Polling { attempts_made: 0 },
            WatchEvent::Polling { attempts_made: 1 },
        ]
    );
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(handle.status(), WatchStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_terminal_state_keeps_it() {
    let fetcher = ScriptedFetcher::new(vec![Ok(Some(resolved("yes")))]);
    let (handle, mut rx) = start(fetcher, pending(), options(3));
    collect_until_terminal(&mut rx).await;

    handle.cancel();
    assert_eq!(handle.status(), WatchStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_attempt_progress() {
    let fetcher = ScriptedFetcher::new(Vec::new());
    let (handle, mut rx) = start(fetcher, pending(), options(4));
    let mut states = handle.subscribe();
    assert!(handle.is_polling());

    let state = states
        .wait_for(|state| state.attempts_made >= 2)
        .await
        .expect("watch state")
        .clone();
    assert_eq!(state.status, WatchStatus::Polling);

    collect_until_terminal(&mut rx).await;
    assert_eq!(handle.state().attempts_made, 4);
    assert!(!handle.is_polling());
}
