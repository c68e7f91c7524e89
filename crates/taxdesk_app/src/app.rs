use std::io;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use taxdesk_core::{ChatAnswer, ChatPhase, ChatState, JobId, JobResource};
use taxdesk_engine::{
    AtomicFileWriter, ChatApi, ChatSessionHandle, EnvTokenProvider, SessionDeps, TokenProvider,
    Transcript,
};
use taxdesk_logging::{desk_info, desk_warn};

use crate::config::AppConfig;
use crate::render::TerminalRenderer;

/// What the user asked the binary to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ask(String),
    Watch(JobId),
}

/// How a run ended, as last seen on screen.
#[derive(Debug)]
pub struct Outcome {
    pub phase: ChatPhase,
    pub state: ChatState,
}

pub async fn run(request: Request, config: &AppConfig, retries: u32) -> anyhow::Result<Outcome> {
    let api = Arc::new(ChatApi::new(config.api_settings()).context("building http client")?);
    let tokens: Arc<dyn TokenProvider> = Arc::new(EnvTokenProvider::new(&config.token_env_var));
    let deps = SessionDeps {
        fetcher: api.clone(),
        submitter: api.clone(),
        tokens: tokens.clone(),
    };
    let session = ChatSessionHandle::spawn(deps, config.session_options()?);

    match request {
        Request::Ask(question) => {
            desk_info!("asking a question of {} chars", question.chars().count());
            session.ask(question);
        }
        Request::Watch(id) => {
            let snapshot = initial_snapshot(&api, tokens.as_ref(), id).await;
            session.mount(snapshot);
        }
    }

    let phase = follow(&session, retries).await?;
    let state = session.shutdown().await;
    Ok(Outcome { phase, state })
}

/// Renders views until the flow settles, retrying timeouts up to `retries`
/// times. Ctrl-C ends the wait early.
async fn follow(session: &ChatSessionHandle, mut retries: u32) -> anyhow::Result<ChatPhase> {
    let mut renderer = TerminalRenderer::new(io::stdout());
    let mut views = session.views();
    loop {
        let view = views.borrow_and_update().clone();
        renderer.render(&view)?;

        if view.phase == ChatPhase::TimedOut && retries > 0 {
            retries -= 1;
            desk_info!("retrying after timeout, {} retries left", retries);
            session.retry();
        } else if view.phase.is_settled() {
            return Ok(view.phase);
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(view.phase);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                desk_info!("interrupted while {:?}", view.phase);
                return Ok(view.phase);
            }
        }
    }
}

/// Reads the chat once so an already answered chat opens without polling.
/// Any problem here is left for the watcher to report.
async fn initial_snapshot(
    api: &ChatApi,
    tokens: &dyn TokenProvider,
    id: JobId,
) -> JobResource<ChatAnswer> {
    let Some(token) = tokens.get_token().await else {
        return JobResource::pending(id);
    };
    match api.get_chat(&token, &id).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => JobResource::pending(id),
        Err(err) => {
            desk_warn!("initial read of chat {} failed: {}", id, err);
            JobResource::pending(id)
        }
    }
}

/// Writes the finished answer to `<dir>/<chat-id>.md`. Returns `None` when
/// there is nothing to save.
pub fn save_transcript(
    outcome: &Outcome,
    writer: &AtomicFileWriter,
) -> anyhow::Result<Option<std::path::PathBuf>> {
    if outcome.phase != ChatPhase::Done {
        return Ok(None);
    }
    let (Some(chat_id), Some(answer)) = (outcome.state.chat_id(), outcome.state.answer()) else {
        return Ok(None);
    };
    let answered_at = outcome
        .state
        .snapshot()
        .and_then(|snapshot| snapshot.updated_at)
        .or_else(|| Some(Utc::now()));
    let transcript = Transcript {
        chat_id: chat_id.to_string(),
        question: outcome.state.question().map(ToOwned::to_owned),
        answer: answer.to_string(),
        answered_at,
    };
    let path = transcript
        .save(writer)
        .with_context(|| format!("saving transcript for chat {chat_id}"))?;
    desk_info!("transcript written to {:?}", path);
    Ok(Some(path))
}
