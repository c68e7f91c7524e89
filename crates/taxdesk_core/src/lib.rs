//! Taxdesk core: pure state machines for polling, reveal, and the chat flow.
//!
//! Nothing in this crate touches a clock, a socket, or a thread. The engine
//! crate drives these machines from tokio timers and feeds the outcomes back.
mod effect;
mod error;
mod job;
mod msg;
mod reveal;
mod state;
mod update;
mod view_model;
mod watch;

pub use effect::Effect;
pub use error::{ConfigError, WatchError};
pub use job::{ChatAnswer, JobId, JobResource};
pub use msg::Msg;
pub use reveal::{RevealOptions, RevealSession, RevealStep};
pub use state::{ChatPhase, ChatState};
pub use update::update;
pub use view_model::ChatViewModel;
pub use watch::{WatchEvent, WatchOptions, WatchSession, WatchStatus, WatchStep};
