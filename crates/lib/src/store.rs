//! Client-side chat state and its transitions.
//!
//! All chat/session UI state lives in one container. The rendering layer
//! dispatches [`ChatAction`] values into [`ChatState::apply`] and drives the
//! fetches itself; `apply` never does I/O.
//!
//! Every asynchronous completion (`HistoryLoaded`, `SendSucceeded`,
//! `SendFailed`) carries the session id that was current when its request was
//! dispatched. `apply` discards completions whose tag no longer matches the
//! current session, so a response that lands after a session switch cannot be
//! applied to the wrong transcript. A discarded send completion still clears
//! the loading flag: the in-flight send is over either way.

use crate::models::{self, Model};
use crate::monitor::Link;
use crate::session::{Message, Session};

/// Why a send is currently not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBlocked {
    Empty,
    Busy,
    Disconnected,
    NoModelSelected,
}

impl std::fmt::Display for SendBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendBlocked::Empty => write!(f, "message is empty"),
            SendBlocked::Busy => write!(f, "a message is already in flight"),
            SendBlocked::Disconnected => {
                write!(f, "backend is unreachable; sending is disabled until it returns")
            }
            SendBlocked::NoModelSelected => write!(f, "select a model before sending"),
        }
    }
}

/// One state transition. Async completions carry the session id that was
/// current at dispatch time (the stale-response tag).
#[derive(Debug, Clone)]
pub enum ChatAction {
    SessionsLoaded(Vec<Session>),
    /// None selects the unsaved "new chat" buffer.
    SessionSelected(Option<i64>),
    HistoryLoaded {
        session: Option<i64>,
        messages: Vec<Message>,
    },
    ModelsLoaded(Vec<Model>),
    ModelSelected(String),
    SendStarted {
        content: String,
    },
    SendSucceeded {
        session: Option<i64>,
        reply: Option<Message>,
        new_session: Option<i64>,
    },
    SendFailed {
        session: Option<i64>,
        error: String,
    },
    LinkChanged(Link),
}

#[derive(Debug, Default)]
pub struct ChatState {
    /// Sessions in backend order (that order is authoritative).
    pub sessions: Vec<Session>,
    /// None = unsaved new chat; the backend assigns an id on the first send.
    pub current_session: Option<i64>,
    /// Transcript of the current session, insertion order.
    pub messages: Vec<Message>,
    pub models: Vec<Model>,
    pub selected_model: Option<String>,
    /// True while a send is in flight; gates the input.
    pub loading: bool,
    pub link: Link,
    /// Last send error, shown to the user; cleared on the next send.
    pub last_error: Option<String>,
    /// Raised when a send created a new session and the session list must be
    /// re-fetched. The driver clears it when it starts the fetch.
    pub sessions_stale: bool,
    /// Set by the first `SessionsLoaded`; later refreshes never move the selection.
    bootstrapped: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the selected model exists in the fetched directory. A send
    /// is only permitted against a listed model.
    pub fn selected_model_listed(&self) -> bool {
        match self.selected_model.as_deref() {
            Some(name) => self.models.iter().any(|m| m.name == name),
            None => false,
        }
    }

    /// True when the send controls should accept input.
    pub fn can_send(&self) -> bool {
        !self.loading && self.link == Link::Connected && self.selected_model_listed()
    }

    /// Gate a send attempt. Err names the reason to surface to the user; the
    /// caller must not issue the network call in that case.
    pub fn check_send(&self, content: &str) -> Result<(), SendBlocked> {
        if content.trim().is_empty() {
            return Err(SendBlocked::Empty);
        }
        if self.loading {
            return Err(SendBlocked::Busy);
        }
        if self.link == Link::Disconnected {
            return Err(SendBlocked::Disconnected);
        }
        if !self.selected_model_listed() {
            return Err(SendBlocked::NoModelSelected);
        }
        Ok(())
    }

    pub fn apply(&mut self, action: ChatAction) {
        match action {
            ChatAction::SessionsLoaded(sessions) => {
                self.sessions = sessions;
                self.sessions_stale = false;
                // First load only: adopt the first session when nothing is
                // selected yet. Refreshes never move the selection.
                if !self.bootstrapped {
                    self.bootstrapped = true;
                    if self.current_session.is_none() {
                        self.current_session = self.sessions.first().map(|s| s.id);
                    }
                }
            }
            ChatAction::SessionSelected(id) => {
                // Switching replaces the transcript wholesale; any unsent
                // optimism for the previous session is discarded.
                self.current_session = id;
                self.messages.clear();
                self.last_error = None;
            }
            ChatAction::HistoryLoaded { session, messages } => {
                if session == self.current_session {
                    self.messages = messages;
                }
            }
            ChatAction::ModelsLoaded(list) => {
                self.selected_model = models::reconcile_selection(self.selected_model.take(), &list);
                self.models = list;
            }
            ChatAction::ModelSelected(name) => {
                self.selected_model = Some(name);
            }
            ChatAction::SendStarted { content } => {
                self.last_error = None;
                self.loading = true;
                self.messages.push(Message::user(content));
            }
            ChatAction::SendSucceeded {
                session,
                reply,
                new_session,
            } => {
                self.loading = false;
                if session != self.current_session {
                    return;
                }
                if let Some(reply) = reply {
                    self.messages.push(reply);
                }
                if self.current_session.is_none() {
                    if let Some(id) = new_session {
                        self.current_session = Some(id);
                        self.sessions_stale = true;
                    }
                }
            }
            ChatAction::SendFailed { session, error } => {
                self.loading = false;
                if session != self.current_session {
                    return;
                }
                self.last_error = Some(error);
            }
            ChatAction::LinkChanged(link) => {
                self.link = link;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> Model {
        Model {
            name: name.to_string(),
            size: 4_000_000_000,
            modified_at: String::new(),
            digest: String::new(),
        }
    }

    fn session(id: i64, model_name: &str) -> Session {
        Session {
            id,
            model_name: model_name.to_string(),
            created_at: String::new(),
        }
    }

    /// State with one listed, selected model; ready to send.
    fn ready_state() -> ChatState {
        let mut state = ChatState::new();
        state.apply(ChatAction::ModelsLoaded(vec![model("llama3")]));
        state.apply(ChatAction::ModelSelected("llama3".to_string()));
        state
    }

    #[test]
    fn send_blocked_while_loading() {
        let mut state = ready_state();
        state.apply(ChatAction::SendStarted {
            content: "Hello".to_string(),
        });
        assert_eq!(state.check_send("again"), Err(SendBlocked::Busy));
        assert!(!state.can_send());
    }

    #[test]
    fn send_blocked_while_disconnected() {
        let mut state = ready_state();
        state.apply(ChatAction::LinkChanged(Link::Disconnected));
        assert_eq!(state.check_send("Hello"), Err(SendBlocked::Disconnected));
        assert!(state.messages.is_empty());
    }

    #[test]
    fn send_blocked_without_listed_model() {
        let mut state = ChatState::new();
        assert_eq!(state.check_send("Hello"), Err(SendBlocked::NoModelSelected));
        // A selection that is not in the directory does not satisfy the gate.
        state.apply(ChatAction::ModelSelected("ghost".to_string()));
        assert_eq!(state.check_send("Hello"), Err(SendBlocked::NoModelSelected));
    }

    #[test]
    fn send_blocked_on_empty_input() {
        let state = ready_state();
        assert_eq!(state.check_send("   "), Err(SendBlocked::Empty));
    }

    #[test]
    fn new_chat_send_adopts_created_session() {
        let mut state = ready_state();
        assert_eq!(state.current_session, None);

        state.apply(ChatAction::SendStarted {
            content: "Hello".to_string(),
        });
        // Optimistic user message is visible before the network completes.
        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].is_user());
        assert!(state.loading);

        state.apply(ChatAction::SendSucceeded {
            session: None,
            reply: Some(Message::assistant("Hi!")),
            new_session: Some(7),
        });
        assert!(!state.loading);
        assert_eq!(state.current_session, Some(7));
        assert!(state.sessions_stale, "driver must refresh the session list");
        let roles: Vec<&str> = state.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
        assert_eq!(state.messages[1].content, "Hi!");
    }

    #[test]
    fn failed_send_keeps_optimistic_message() {
        let mut state = ready_state();
        state.apply(ChatAction::SendStarted {
            content: "Hello".to_string(),
        });
        state.apply(ChatAction::SendFailed {
            session: None,
            error: "backend api error: 503".to_string(),
        });
        assert!(!state.loading);
        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].is_user());
        assert!(state.last_error.is_some());
    }

    #[test]
    fn stale_send_result_is_discarded_but_clears_loading() {
        let mut state = ready_state();
        state.apply(ChatAction::SessionsLoaded(vec![session(1, "llama3")]));
        assert_eq!(state.current_session, Some(1));

        state.apply(ChatAction::SendStarted {
            content: "Hello".to_string(),
        });
        // User switches away while the send is in flight.
        state.apply(ChatAction::SessionSelected(Some(2)));
        state.apply(ChatAction::SendSucceeded {
            session: Some(1),
            reply: Some(Message::assistant("late")),
            new_session: None,
        });
        assert!(!state.loading, "loading clears even for stale results");
        assert!(
            state.messages.is_empty(),
            "late reply must not land in the new session"
        );

        // Same for a stale failure: loading clears, no error is surfaced.
        state.apply(ChatAction::SendStarted {
            content: "Again".to_string(),
        });
        state.apply(ChatAction::SessionSelected(None));
        state.apply(ChatAction::SendFailed {
            session: Some(2),
            error: "late failure".to_string(),
        });
        assert!(!state.loading);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn stale_history_is_discarded() {
        let mut state = ChatState::new();
        state.apply(ChatAction::SessionSelected(Some(1)));
        state.apply(ChatAction::SessionSelected(Some(2)));
        state.apply(ChatAction::HistoryLoaded {
            session: Some(1),
            messages: vec![Message::user("old")],
        });
        assert!(state.messages.is_empty());
        state.apply(ChatAction::HistoryLoaded {
            session: Some(2),
            messages: vec![Message::user("current")],
        });
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, "current");
    }

    #[test]
    fn switching_sessions_replaces_transcript() {
        let mut state = ChatState::new();
        state.apply(ChatAction::HistoryLoaded {
            session: None,
            messages: vec![Message::user("draft")],
        });
        assert_eq!(state.messages.len(), 1);

        // To null (new chat) and back: transcript cleared both times, so the
        // driver always re-fetches rather than reusing a stale local list.
        state.apply(ChatAction::SessionSelected(None));
        assert!(state.messages.is_empty());
        state.apply(ChatAction::SessionSelected(Some(3)));
        assert!(state.messages.is_empty());
        assert_eq!(state.current_session, Some(3));
    }

    #[test]
    fn first_sessions_load_selects_first() {
        let mut state = ChatState::new();
        state.apply(ChatAction::SessionsLoaded(vec![
            session(5, "llama3"),
            session(2, "gemma"),
        ]));
        assert_eq!(state.current_session, Some(5));
    }

    #[test]
    fn sessions_refresh_keeps_selection() {
        let mut state = ChatState::new();
        state.apply(ChatAction::SessionsLoaded(vec![session(5, "llama3")]));
        state.apply(ChatAction::SessionSelected(None));
        // A refresh after the user started a new chat must not steal focus.
        state.apply(ChatAction::SessionsLoaded(vec![
            session(5, "llama3"),
            session(6, "gemma"),
        ]));
        assert_eq!(state.current_session, None);
    }

    #[test]
    fn models_reload_clears_vanished_selection() {
        let mut state = ready_state();
        assert!(state.selected_model_listed());
        state.apply(ChatAction::ModelsLoaded(vec![model("gemma")]));
        assert_eq!(state.selected_model, None);
        assert!(!state.can_send());
    }

    #[test]
    fn send_error_cleared_on_next_send() {
        let mut state = ready_state();
        state.apply(ChatAction::SendStarted {
            content: "one".to_string(),
        });
        state.apply(ChatAction::SendFailed {
            session: None,
            error: "boom".to_string(),
        });
        assert!(state.last_error.is_some());
        state.apply(ChatAction::SendStarted {
            content: "two".to_string(),
        });
        assert_eq!(state.last_error, None);
    }
}
