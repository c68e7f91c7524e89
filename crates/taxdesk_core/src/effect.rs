use crate::{ChatAnswer, JobResource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestToken,
    SubmitQuestion {
        token: String,
        question: String,
    },
    /// Start polling; events come back as `Msg::Watch { run, .. }`.
    StartWatch {
        run: u64,
        token: String,
        initial: JobResource<ChatAnswer>,
    },
    /// Start typing `text`; output comes back tagged with `run`.
    StartReveal {
        run: u64,
        text: String,
        streaming: bool,
    },
    CancelWatch,
    CancelReveal,
}
