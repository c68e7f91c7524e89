use std::time::Duration;

use taxdesk_core::{
    ConfigError, JobId, JobResource, WatchError, WatchEvent, WatchOptions, WatchSession,
    WatchStatus, WatchStep,
};

fn job_id() -> JobId {
    JobId::new("chat-1").unwrap()
}

fn options(max_attempts: u32) -> WatchOptions {
    WatchOptions::new(Duration::from_millis(1500), max_attempts).unwrap()
}

#[test]
fn options_reject_zero_interval_and_zero_attempts() {
    assert_eq!(
        WatchOptions::new(Duration::ZERO, 3),
        Err(ConfigError::ZeroInterval)
    );
    assert_eq!(
        WatchOptions::new(Duration::from_millis(10), 0),
        Err(ConfigError::ZeroAttempts)
    );
    assert_eq!(options(60).ceiling(), Duration::from_secs(90));
}

#[test]
fn job_id_rejects_blank_input() {
    assert_eq!(JobId::new("   "), Err(ConfigError::EmptyJobId));
    assert_eq!(JobId::new(" abc ").unwrap().as_str(), "abc");
}

#[test]
fn resolved_snapshot_succeeds_without_polling() {
    let initial = JobResource::resolved(job_id(), "answer".to_string());
    let (session, step) = WatchSession::start(initial.clone(), options(3));

    assert_eq!(session.status(), WatchStatus::Succeeded);
    assert_eq!(session.attempts_made(), 0);
    assert_eq!(step, WatchStep::Finished(WatchEvent::Succeeded(initial)));
}

#[test]
fn pending_snapshot_schedules_first_fetch_after_interval() {
    let (session, step) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(3));

    assert_eq!(session.status(), WatchStatus::Polling);
    assert_eq!(
        step,
        WatchStep::Continue {
            attempts_made: 0,
            delay: Duration::from_millis(1500)
        }
    );
}

#[test]
fn exhausts_exactly_at_max_attempts() {
    let (mut session, _) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(3));

    for expected in 1..3 {
        let step = session.on_fetched(Some(JobResource::pending(job_id())));
        assert_eq!(
            step,
            WatchStep::Continue {
                attempts_made: expected,
                delay: Duration::from_millis(1500)
            }
        );
    }

    let step = session.on_fetched(Some(JobResource::pending(job_id())));
    assert_eq!(
        step,
        WatchStep::Finished(WatchEvent::Exhausted { attempts_made: 3 })
    );
    assert_eq!(session.status(), WatchStatus::Exhausted);
    assert!(session.last_error().is_none());

    // Late input after the terminal state changes nothing.
    let late = session.on_fetched(Some(JobResource::resolved(job_id(), "x".to_string())));
    assert_eq!(late, WatchStep::Ignored);
    assert_eq!(session.status(), WatchStatus::Exhausted);
}

#[test]
fn success_replaces_snapshot() {
    let (mut session, _) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(5));
    session.on_fetched(Some(JobResource::pending(job_id())));

    let done = JobResource::resolved(job_id(), "done".to_string());
    let step = session.on_fetched(Some(done.clone()));

    assert_eq!(step, WatchStep::Finished(WatchEvent::Succeeded(done.clone())));
    assert_eq!(session.resource(), &done);
    assert_eq!(session.attempts_made(), 1);
}

#[test]
fn missing_resource_fails_as_not_found() {
    let (mut session, _) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(5));

    let step = session.on_fetched(None);

    assert_eq!(step, WatchStep::Finished(WatchEvent::Failed(WatchError::NotFound)));
    assert_eq!(session.status(), WatchStatus::Failed);
    assert_eq!(session.last_error(), Some(&WatchError::NotFound));
}

#[test]
fn fetch_failure_is_terminal() {
    let (mut session, _) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(5));

    let error = WatchError::fetch("network error: connection reset");
    let step = session.on_fetch_failed(error.clone());

    assert_eq!(step, WatchStep::Finished(WatchEvent::Failed(error.clone())));
    assert_eq!(session.last_error(), Some(&error));
    assert_eq!(
        session.on_fetched(Some(JobResource::pending(job_id()))),
        WatchStep::Ignored
    );
}

#[test]
fn cancel_only_affects_live_sessions() {
    let (mut live, _) = WatchSession::<String>::start(JobResource::pending(job_id()), options(5));
    assert!(live.cancel());
    assert!(!live.cancel());
    assert_eq!(live.status(), WatchStatus::Cancelled);
    assert_eq!(
        live.on_fetched(Some(JobResource::resolved(job_id(), "late".to_string()))),
        WatchStep::Ignored
    );

    let (mut done, _) =
        WatchSession::start(JobResource::resolved(job_id(), "x".to_string()), options(5));
    assert!(!done.cancel());
    assert_eq!(done.status(), WatchStatus::Succeeded);
}

#[test]
fn snapshot_for_another_id_fails_and_keeps_the_watched_id() {
    let (mut session, _) =
        WatchSession::<String>::start(JobResource::pending(job_id()), options(5));
    let other = JobId::new("chat-2").unwrap();

    let step = session.on_fetched(Some(JobResource::resolved(other.clone(), "x".to_string())));

    let expected = WatchError::UnexpectedId {
        expected: job_id(),
        found: other,
    };
    assert_eq!(step, WatchStep::Finished(WatchEvent::Failed(expected.clone())));
    assert_eq!(session.id(), &job_id());
    assert_eq!(session.resource(), &JobResource::pending(job_id()));
    assert_eq!(session.status(), WatchStatus::Failed);
    assert_eq!(session.last_error(), Some(&expected));
}
