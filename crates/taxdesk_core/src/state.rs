use crate::view_model::ChatViewModel;
use crate::{ChatAnswer, JobId, JobResource};

/// Where the chat flow currently stands. Terminal outcomes are kept apart so
/// the front end can say "still processing" instead of "error".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    /// Waiting for the token lookup.
    Authorizing,
    /// Posting the question to the backend.
    Submitting,
    /// Polling for the answer.
    Thinking,
    /// Typing the answer out.
    Streaming,
    Done,
    /// Attempt budget spent while the job was still running.
    TimedOut,
    NotFound,
    Failed(String),
    AuthRequired,
    /// The view was torn down; every later message is dropped.
    Closed,
}

impl ChatPhase {
    /// A session is live: timers or requests may still report back.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ChatPhase::Authorizing
                | ChatPhase::Submitting
                | ChatPhase::Thinking
                | ChatPhase::Streaming
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatPhase::TimedOut | ChatPhase::Failed(_))
    }

    /// Nothing more will happen without user input.
    pub fn is_settled(&self) -> bool {
        !self.is_busy() && *self != ChatPhase::Idle
    }

    pub fn status_line(&self, attempts: u32) -> String {
        match self {
            ChatPhase::Idle | ChatPhase::Closed => String::new(),
            ChatPhase::Authorizing => "Checking sign-in...".to_string(),
            ChatPhase::Submitting => "Sending question...".to_string(),
            ChatPhase::Thinking if attempts == 0 => "Thinking...".to_string(),
            ChatPhase::Thinking => format!("Thinking... (checked {attempts} times)"),
            ChatPhase::Streaming => "Answering...".to_string(),
            ChatPhase::Done => "Done.".to_string(),
            ChatPhase::TimedOut => {
                "Still processing after the allowed wait. Retry to keep waiting.".to_string()
            }
            ChatPhase::NotFound => "Chat not found.".to_string(),
            ChatPhase::Failed(message) => format!("Error: {message}"),
            ChatPhase::AuthRequired => "Sign in required.".to_string(),
        }
    }
}

/// What to do once the token lookup comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingIntent {
    Ask(String),
    Watch(JobResource<ChatAnswer>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    phase: ChatPhase,
    chat_id: Option<JobId>,
    question: Option<String>,
    snapshot: Option<JobResource<ChatAnswer>>,
    token: Option<String>,
    pending: Option<PendingIntent>,
    /// Bumped whenever a new ask, mount or retry starts. Watch and reveal
    /// messages carry the run they belong to; others are stale.
    run: u64,
    visible_text: String,
    attempts: u32,
    dirty: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ChatViewModel {
        ChatViewModel {
            chat_id: self.chat_id.as_ref().map(ToString::to_string),
            phase: self.phase.clone(),
            is_polling: self.phase == ChatPhase::Thinking,
            is_streaming: self.phase == ChatPhase::Streaming,
            visible_text: self.visible_text.clone(),
            attempts: self.attempts,
            status_line: self.phase.status_line(self.attempts),
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> &ChatPhase {
        &self.phase
    }

    pub fn chat_id(&self) -> Option<&JobId> {
        self.chat_id.as_ref()
    }

    /// Current run number, see [`Msg::Watch`](crate::Msg::Watch).
    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// Latest known snapshot of the chat job.
    pub fn snapshot(&self) -> Option<&JobResource<ChatAnswer>> {
        self.snapshot.as_ref()
    }

    /// The full answer once the job has one, regardless of reveal progress.
    pub fn answer(&self) -> Option<&str> {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.result.as_ref())
            .map(|answer| answer.text.as_str())
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn set_phase(&mut self, phase: ChatPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.dirty = true;
        }
    }

    pub(crate) fn reset_for(&mut self, intent: PendingIntent) {
        match &intent {
            PendingIntent::Ask(question) => {
                self.question = Some(question.clone());
                self.chat_id = None;
                self.snapshot = None;
            }
            PendingIntent::Watch(snapshot) => {
                self.chat_id = Some(snapshot.id.clone());
                self.snapshot = Some(snapshot.clone());
            }
        }
        self.token = None;
        self.pending = Some(intent);
        self.run += 1;
        self.visible_text.clear();
        self.attempts = 0;
        self.dirty = true;
        self.set_phase(ChatPhase::Authorizing);
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingIntent> {
        self.pending.take()
    }

    /// Intent that repeats the last session: watch the known chat again, or
    /// resend the question when no chat was ever created.
    pub(crate) fn retry_intent(&self) -> Option<PendingIntent> {
        if let Some(snapshot) = &self.snapshot {
            return Some(PendingIntent::Watch(snapshot.clone()));
        }
        self.question.clone().map(PendingIntent::Ask)
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: JobResource<ChatAnswer>) {
        self.chat_id = Some(snapshot.id.clone());
        self.snapshot = Some(snapshot);
        self.dirty = true;
    }

    pub(crate) fn set_attempts(&mut self, attempts: u32) {
        if self.attempts != attempts {
            self.attempts = attempts;
            self.dirty = true;
        }
    }

    pub(crate) fn set_visible_text(&mut self, text: String) {
        if self.visible_text != text {
            self.visible_text = text;
            self.dirty = true;
        }
    }

    pub(crate) fn close(&mut self) {
        self.pending = None;
        self.token = None;
        self.set_phase(ChatPhase::Closed);
    }
}
