//! Output events relayed from sub-agents to the session driver.

use serde::{Deserialize, Serialize};

/// Which component produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Router,
    Researcher,
    Clarifier,
    Asker,
}

impl Author {
    pub fn as_str(self) -> &'static str {
        match self {
            Author::Router => "router",
            Author::Researcher => "researcher",
            Author::Clarifier => "clarifier",
            Author::Asker => "asker",
        }
    }
}

/// One immutable unit of output for a turn.
///
/// Events are produced in call order and concatenated across sub-invocations;
/// the session driver decides which authors' text to surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub author: Author,
    pub text: Option<String>,
}

impl Event {
    pub fn text(author: Author, text: impl Into<String>) -> Self {
        Self {
            author,
            text: Some(text.into()),
        }
    }
}
