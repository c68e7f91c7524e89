use std::sync::Arc;

use taxdesk_core::{
    update, ChatAnswer, ChatState, ChatViewModel, Effect, JobResource, Msg, RevealOptions,
    WatchEvent, WatchOptions,
};
use taxdesk_logging::{desk_debug, desk_info, desk_warn, TARGET_SESSION};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::fetch::{ChatSubmitter, ResourceFetcher};
use crate::revealer::{RevealSink, TypewriterRevealer};
use crate::token::TokenProvider;
use crate::watcher::{PollingJobWatcher, WatchHandle};

/// Collaborators a chat session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub fetcher: Arc<dyn ResourceFetcher<ChatAnswer>>,
    pub submitter: Arc<dyn ChatSubmitter>,
    pub tokens: Arc<dyn TokenProvider>,
}

/// Timing for one chat session. With `reveal.streaming() == false` answers
/// are never animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub watch: WatchOptions,
    pub reveal: RevealOptions,
}

/// Runs one chat view: feeds messages through [`update`], executes the
/// resulting effects, and publishes the view model whenever it changes.
pub struct ChatSessionHandle {
    msg_tx: mpsc::UnboundedSender<Msg>,
    view_rx: watch::Receiver<ChatViewModel>,
    task: JoinHandle<ChatState>,
}

impl ChatSessionHandle {
    /// Spawns the session loop on the current tokio runtime.
    pub fn spawn(deps: SessionDeps, options: SessionOptions) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ChatViewModel::default());
        let runner = EffectRunner::new(deps, options, msg_tx.downgrade());
        let task = tokio::spawn(run_session(runner, msg_rx, view_tx));
        Self {
            msg_tx,
            view_rx,
            task,
        }
    }

    /// Queues a message. Returns `false` once the session has shut down.
    pub fn send(&self, msg: Msg) -> bool {
        self.msg_tx.send(msg).is_ok()
    }

    pub fn mount(&self, snapshot: JobResource<ChatAnswer>) -> bool {
        self.send(Msg::Mounted(snapshot))
    }

    pub fn ask(&self, question: impl Into<String>) -> bool {
        self.send(Msg::QuestionSubmitted(question.into()))
    }

    pub fn retry(&self) -> bool {
        self.send(Msg::RetryClicked)
    }

    pub fn view(&self) -> ChatViewModel {
        self.view_rx.borrow().clone()
    }

    pub fn views(&self) -> watch::Receiver<ChatViewModel> {
        self.view_rx.clone()
    }

    /// Unmounts the view, cancelling watcher and revealer, and returns the
    /// final state.
    pub async fn shutdown(self) -> ChatState {
        let _ = self.msg_tx.send(Msg::Unmounted);
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                desk_warn!(target: TARGET_SESSION, "session task ended abnormally: {}", err);
                ChatState::default()
            }
        }
    }
}

async fn run_session(
    mut runner: EffectRunner,
    mut msg_rx: mpsc::UnboundedReceiver<Msg>,
    view_tx: watch::Sender<ChatViewModel>,
) -> ChatState {
    let mut state = ChatState::new();
    loop {
        // Every handle gone counts as an unmount.
        let msg = msg_rx.recv().await.unwrap_or(Msg::Unmounted);
        let closing = msg == Msg::Unmounted;

        let (next, effects) = update(state, msg);
        state = next;
        for effect in effects {
            runner.run(effect);
        }

        let view = state.view();
        if state.consume_dirty() {
            view_tx.send_replace(view);
        }
        if closing {
            desk_info!(target: TARGET_SESSION, "session closed");
            break;
        }
    }
    state
}

struct EffectRunner {
    deps: SessionDeps,
    options: SessionOptions,
    watcher: PollingJobWatcher<ChatAnswer>,
    revealer: TypewriterRevealer,
    watch: Option<WatchHandle<ChatAnswer>>,
    msg_tx: mpsc::WeakUnboundedSender<Msg>,
}

impl EffectRunner {
    fn new(
        deps: SessionDeps,
        options: SessionOptions,
        msg_tx: mpsc::WeakUnboundedSender<Msg>,
    ) -> Self {
        Self {
            watcher: PollingJobWatcher::new(deps.fetcher.clone()),
            revealer: TypewriterRevealer::new(),
            deps,
            options,
            watch: None,
            msg_tx,
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::RequestToken => {
                let tokens = self.deps.tokens.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let token = tokens.get_token().await;
                    post(&tx, Msg::TokenResolved(token));
                });
            }
            Effect::SubmitQuestion { token, question } => {
                let submitter = self.deps.submitter.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let msg = match submitter.create_chat(&token, &question).await {
                        Ok(snapshot) => {
                            desk_info!(target: TARGET_SESSION, "chat {} created", snapshot.id);
                            Msg::ChatCreated(snapshot)
                        }
                        Err(err) => {
                            desk_warn!(target: TARGET_SESSION, "create chat failed: {}", err);
                            Msg::SubmitFailed(err.to_string())
                        }
                    };
                    post(&tx, msg);
                });
            }
            Effect::StartWatch {
                run,
                token,
                initial,
            } => {
                self.cancel_watch();
                let tx = self.msg_tx.clone();
                let sink = Arc::new(move |event: WatchEvent<ChatAnswer>| {
                    post(&tx, Msg::Watch { run, event });
                });
                self.watch = Some(self.watcher.start(token, initial, self.options.watch, sink));
            }
            Effect::StartReveal {
                run,
                text,
                streaming,
            } => {
                let options = self
                    .options
                    .reveal
                    .with_streaming(streaming && self.options.reveal.streaming());
                let sink = Arc::new(MsgRevealSink {
                    run,
                    tx: self.msg_tx.clone(),
                });
                self.revealer.reveal(text, options, sink);
            }
            Effect::CancelWatch => self.cancel_watch(),
            Effect::CancelReveal => self.revealer.cancel(),
        }
    }

    fn cancel_watch(&mut self) {
        if let Some(handle) = self.watch.take() {
            desk_debug!(target: TARGET_SESSION, "cancelling watch");
            handle.cancel();
        }
    }
}

struct MsgRevealSink {
    run: u64,
    tx: mpsc::WeakUnboundedSender<Msg>,
}

impl RevealSink for MsgRevealSink {
    fn on_progress(&self, prefix: &str) {
        post(
            &self.tx,
            Msg::RevealProgress {
                run: self.run,
                prefix: prefix.to_owned(),
            },
        );
    }

    fn on_complete(&self) {
        post(&self.tx, Msg::RevealCompleted { run: self.run });
    }
}

fn post(tx: &mpsc::WeakUnboundedSender<Msg>, msg: Msg) {
    if let Some(tx) = tx.upgrade() {
        let _ = tx.send(msg);
    }
}
