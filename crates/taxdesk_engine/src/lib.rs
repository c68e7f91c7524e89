//! Taxdesk engine: async side of the chat flow.
//!
//! Drives the pure machines from `taxdesk_core` with tokio timers, talks to
//! the REST chat API, and persists finished transcripts.
mod fetch;
mod gate;
mod persist;
mod revealer;
mod session;
mod token;
mod types;
mod watcher;

pub use fetch::{ApiSettings, ChatApi, ChatSubmitter, ResourceFetcher};
pub use persist::{AtomicFileWriter, PersistError, Transcript};
pub use revealer::{RevealHandle, RevealSink, TypewriterRevealer};
pub use session::{ChatSessionHandle, SessionDeps, SessionOptions};
pub use token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use types::{FailureKind, FetchError};
pub use watcher::{PollingJobWatcher, WatchHandle, WatchSink, WatchState};
