use std::time::Duration;

use crate::{ConfigError, JobId, JobResource, WatchError};

/// Poll cadence for one watch session. There are no built-in defaults: the
/// caller's configuration decides how long a job may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    interval: Duration,
    max_attempts: u32,
}

impl WatchOptions {
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            interval,
            max_attempts,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest time a session can spend polling before it is exhausted.
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchStatus {
    #[default]
    Idle,
    Polling,
    Succeeded,
    Exhausted,
    Failed,
    Cancelled,
}

impl WatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WatchStatus::Succeeded
                | WatchStatus::Exhausted
                | WatchStatus::Failed
                | WatchStatus::Cancelled
        )
    }
}

/// Transition reported to whoever observes a watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent<T> {
    /// Still waiting; `attempts_made` polls have come back without a result.
    Polling { attempts_made: u32 },
    /// The job finished. Delivered once per session.
    Succeeded(JobResource<T>),
    /// The attempt budget ran out while the job was still processing.
    Exhausted { attempts_made: u32 },
    Failed(WatchError),
}

/// What the driver has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchStep<T> {
    /// Report progress, wait `delay`, then fetch once more.
    Continue { attempts_made: u32, delay: Duration },
    /// Terminal transition; report the event and stop.
    Finished(WatchEvent<T>),
    /// Input arrived after the session ended and was dropped.
    Ignored,
}

/// Per-watch state: attempt counter, status, last snapshot and last error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSession<T> {
    options: WatchOptions,
    resource: JobResource<T>,
    attempts_made: u32,
    status: WatchStatus,
    last_error: Option<WatchError>,
}

impl<T: Clone> WatchSession<T> {
    /// Starts a session from the snapshot the caller already holds.
    ///
    /// A snapshot that already carries a result succeeds right away, so the
    /// driver never issues a redundant first fetch.
    pub fn start(initial: JobResource<T>, options: WatchOptions) -> (Self, WatchStep<T>) {
        let mut session = Self {
            options,
            resource: initial,
            attempts_made: 0,
            status: WatchStatus::Idle,
            last_error: None,
        };

        let step = if session.resource.is_resolved() {
            session.status = WatchStatus::Succeeded;
            WatchStep::Finished(WatchEvent::Succeeded(session.resource.clone()))
        } else {
            session.status = WatchStatus::Polling;
            WatchStep::Continue {
                attempts_made: 0,
                delay: options.interval(),
            }
        };
        (session, step)
    }

    /// Applies a settled fetch. `None` means the backend had no such resource.
    /// The watched id never changes: a snapshot for another id fails the
    /// session instead of replacing it.
    pub fn on_fetched(&mut self, fetched: Option<JobResource<T>>) -> WatchStep<T> {
        if self.status != WatchStatus::Polling {
            return WatchStep::Ignored;
        }

        let Some(resource) = fetched else {
            return self.fail(WatchError::NotFound);
        };
        if resource.id != self.resource.id {
            return self.fail(WatchError::UnexpectedId {
                expected: self.resource.id.clone(),
                found: resource.id,
            });
        }

        self.resource = resource;
        if self.resource.is_resolved() {
            self.status = WatchStatus::Succeeded;
            return WatchStep::Finished(WatchEvent::Succeeded(self.resource.clone()));
        }

        self.attempts_made += 1;
        if self.attempts_made >= self.options.max_attempts() {
            self.status = WatchStatus::Exhausted;
            return WatchStep::Finished(WatchEvent::Exhausted {
                attempts_made: self.attempts_made,
            });
        }

        WatchStep::Continue {
            attempts_made: self.attempts_made,
            delay: self.options.interval(),
        }
    }

    /// A failed fetch is terminal: no retry happens inside the session.
    pub fn on_fetch_failed(&mut self, error: WatchError) -> WatchStep<T> {
        if self.status != WatchStatus::Polling {
            return WatchStep::Ignored;
        }
        self.fail(error)
    }

    /// Moves a live session to `Cancelled`. Returns `false` when the session
    /// had already reached a terminal state, which it then keeps.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = WatchStatus::Cancelled;
        true
    }

    fn fail(&mut self, error: WatchError) -> WatchStep<T> {
        self.status = WatchStatus::Failed;
        self.last_error = Some(error.clone());
        WatchStep::Finished(WatchEvent::Failed(error))
    }
}

impl<T> WatchSession<T> {
    pub fn id(&self) -> &JobId {
        &self.resource.id
    }

    pub fn resource(&self) -> &JobResource<T> {
        &self.resource
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn last_error(&self) -> Option<&WatchError> {
        self.last_error.as_ref()
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }
}
