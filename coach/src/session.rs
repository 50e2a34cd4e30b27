//! Per-conversation session owned by the session driver.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::core::event::{Author, Event};
use crate::core::state::SessionState;
use crate::io::model::TranscriptEntry;

/// One user conversation: identity, shared state, and message history.
///
/// Exactly one turn borrows a session mutably at a time; the driver creates
/// the session and threads it through every `run_turn` call. History records
/// user text and agent text only — tool round-trips stay inside the
/// invocation that made them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub history: Vec<TranscriptEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: generate_session_id(),
            state: SessionState::new(),
            history: Vec::new(),
        }
    }

    /// Record the user's message for this turn.
    pub fn record_user(&mut self, text: impl Into<String>) {
        self.history.push(TranscriptEntry::User { text: text.into() });
    }

    /// Record the text content of agent events produced this turn.
    ///
    /// Router-authored events (the terminal message) are surfaced to the user
    /// but not fed back to the model as conversation.
    pub fn record_events(&mut self, events: &[Event]) {
        for event in events {
            let Some(text) = &event.text else { continue };
            if event.author == Author::Router {
                continue;
            }
            self.history.push(TranscriptEntry::Agent {
                author: event.author,
                text: text.clone(),
            });
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("session-{millis:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty() {
        let session = Session::new();
        assert!(session.id.starts_with("session-"));
        assert!(session.history.is_empty());
        assert_eq!(session.state, SessionState::new());
    }

    #[test]
    fn record_events_keeps_agent_text_and_skips_router() {
        let mut session = Session::new();
        session.record_user("hi");
        session.record_events(&[
            Event::text(Author::Asker, "hello"),
            Event {
                author: Author::Researcher,
                text: None,
            },
            Event::text(Author::Router, "closing"),
        ]);

        assert_eq!(session.history.len(), 2);
        assert!(matches!(
            &session.history[1],
            TranscriptEntry::Agent { author: Author::Asker, text } if text == "hello"
        ));
    }
}
