use crate::state::PendingIntent;
use crate::{ChatAnswer, ChatPhase, ChatState, Effect, JobResource, Msg, WatchError, WatchEvent};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ChatState, msg: Msg) -> (ChatState, Vec<Effect>) {
    // A torn-down view only ever answers teardown again.
    if *state.phase() == ChatPhase::Closed && msg != Msg::Unmounted {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::QuestionSubmitted(raw) => {
            let question = raw.trim();
            if question.is_empty() || state.phase().is_busy() {
                return (state, Vec::new());
            }
            state.reset_for(PendingIntent::Ask(question.to_owned()));
            vec![Effect::RequestToken]
        }
        Msg::Mounted(snapshot) => {
            // Switching chats tears down whatever the previous one left running.
            let mut effects = if state.phase().is_busy() {
                vec![Effect::CancelWatch, Effect::CancelReveal]
            } else {
                Vec::new()
            };
            if let Some(text) = answer_text(&snapshot) {
                // Already answered before we looked: show it, don't replay typing.
                state.reset_for(PendingIntent::Watch(snapshot));
                state.take_pending();
                state.set_phase(ChatPhase::Streaming);
                effects.push(Effect::StartReveal {
                    run: state.run(),
                    text,
                    streaming: false,
                });
            } else {
                state.reset_for(PendingIntent::Watch(snapshot));
                effects.push(Effect::RequestToken);
            }
            effects
        }
        Msg::TokenResolved(token) => {
            if *state.phase() != ChatPhase::Authorizing {
                return (state, Vec::new());
            }
            let Some(intent) = state.take_pending() else {
                return (state, Vec::new());
            };
            let Some(token) = token else {
                state.set_phase(ChatPhase::AuthRequired);
                return (state, Vec::new());
            };
            state.set_token(token.clone());
            match intent {
                PendingIntent::Ask(question) => {
                    state.set_phase(ChatPhase::Submitting);
                    vec![Effect::SubmitQuestion { token, question }]
                }
                PendingIntent::Watch(initial) => {
                    state.set_phase(ChatPhase::Thinking);
                    vec![Effect::StartWatch {
                        run: state.run(),
                        token,
                        initial,
                    }]
                }
            }
        }
        Msg::ChatCreated(snapshot) => {
            if *state.phase() != ChatPhase::Submitting {
                return (state, Vec::new());
            }
            state.set_snapshot(snapshot.clone());
            if let Some(text) = answer_text(&snapshot) {
                state.set_phase(ChatPhase::Streaming);
                let run = state.run();
                return (
                    state,
                    vec![Effect::StartReveal {
                        run,
                        text,
                        streaming: true,
                    }],
                );
            }
            match state.token().map(ToOwned::to_owned) {
                Some(token) => {
                    state.set_phase(ChatPhase::Thinking);
                    vec![Effect::StartWatch {
                        run: state.run(),
                        token,
                        initial: snapshot,
                    }]
                }
                None => {
                    state.set_phase(ChatPhase::AuthRequired);
                    Vec::new()
                }
            }
        }
        Msg::SubmitFailed(message) => {
            if *state.phase() == ChatPhase::Submitting {
                state.set_phase(ChatPhase::Failed(message));
            }
            Vec::new()
        }
        Msg::Watch { run, event } => {
            if run != state.run() || *state.phase() != ChatPhase::Thinking {
                return (state, Vec::new());
            }
            apply_watch_event(&mut state, event)
        }
        Msg::RevealProgress { run, prefix } => {
            if run == state.run() && *state.phase() == ChatPhase::Streaming {
                state.set_visible_text(prefix);
            }
            Vec::new()
        }
        Msg::RevealCompleted { run } => {
            if run == state.run() && *state.phase() == ChatPhase::Streaming {
                let full = state.answer().map(ToOwned::to_owned).unwrap_or_default();
                state.set_visible_text(full);
                state.set_phase(ChatPhase::Done);
            }
            Vec::new()
        }
        Msg::RetryClicked => {
            if !state.phase().is_retryable() {
                return (state, Vec::new());
            }
            match state.retry_intent() {
                Some(intent) => {
                    state.reset_for(intent);
                    vec![Effect::RequestToken]
                }
                None => Vec::new(),
            }
        }
        Msg::Unmounted => {
            state.close();
            vec![Effect::CancelWatch, Effect::CancelReveal]
        }
    };

    (state, effects)
}

fn apply_watch_event(state: &mut ChatState, event: WatchEvent<ChatAnswer>) -> Vec<Effect> {
    match event {
        WatchEvent::Polling { attempts_made } => {
            state.set_attempts(attempts_made);
            Vec::new()
        }
        WatchEvent::Succeeded(resource) => {
            let text = answer_text(&resource).unwrap_or_default();
            state.set_snapshot(resource);
            state.set_phase(ChatPhase::Streaming);
            vec![Effect::StartReveal {
                run: state.run(),
                text,
                streaming: true,
            }]
        }
        WatchEvent::Exhausted { attempts_made } => {
            state.set_attempts(attempts_made);
            state.set_phase(ChatPhase::TimedOut);
            Vec::new()
        }
        WatchEvent::Failed(WatchError::NotFound) => {
            state.set_phase(ChatPhase::NotFound);
            Vec::new()
        }
        WatchEvent::Failed(WatchError::Fetch { message }) => {
            state.set_phase(ChatPhase::Failed(message));
            Vec::new()
        }
        WatchEvent::Failed(other) => {
            state.set_phase(ChatPhase::Failed(other.to_string()));
            Vec::new()
        }
    }
}

fn answer_text(resource: &JobResource<ChatAnswer>) -> Option<String> {
    resource.result.as_ref().map(|answer| answer.text.clone())
}
