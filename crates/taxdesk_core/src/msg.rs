use crate::{ChatAnswer, JobResource, WatchEvent};

/// Inputs to [`update`](crate::update). Watch and reveal messages name the
/// run that produced them so output from a replaced run can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked a new question.
    QuestionSubmitted(String),
    /// Backend accepted the question and created the chat job.
    ChatCreated(JobResource<ChatAnswer>),
    /// Creating the chat job failed.
    SubmitFailed(String),
    /// A chat view opened with the snapshot it already holds.
    Mounted(JobResource<ChatAnswer>),
    /// Token lookup finished; `None` means nobody is signed in.
    TokenResolved(Option<String>),
    /// Watcher transition.
    Watch {
        run: u64,
        event: WatchEvent<ChatAnswer>,
    },
    /// Typewriter emitted a longer prefix.
    RevealProgress { run: u64, prefix: String },
    /// Typewriter reached the end of the answer.
    RevealCompleted { run: u64 },
    /// User asked to keep waiting after a timeout or error.
    RetryClicked,
    /// The chat view went away.
    Unmounted,
}
