//! Sub-agent profiles for the coaching workflow.
//!
//! All three sub-agents share one contract (render instruction, call the
//! model, resolve tool calls, return events); they differ only in author,
//! instruction template, and allowed tools.

use crate::core::event::Author;
use crate::io::model::ToolSpec;
use crate::tools;

pub mod invoke;

/// Configuration of one sub-agent role.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// Author stamped on every event this agent produces; also selects its
    /// instruction template.
    pub author: Author,
    /// Tools the model may request during an invocation.
    pub tools: Vec<ToolSpec>,
}

impl AgentProfile {
    /// Researcher: searches the web and writes to session research.
    pub fn researcher() -> Self {
        Self {
            author: Author::Researcher,
            tools: vec![tools::web_search_spec()],
        }
    }

    /// Clarifier: generates actionable options and saves them.
    pub fn clarifier() -> Self {
        Self {
            author: Author::Clarifier,
            tools: vec![tools::save_options_spec()],
        }
    }

    /// Asker: user-facing voice; reads state, calls no tools.
    pub fn asker() -> Self {
        Self {
            author: Author::Asker,
            tools: Vec::new(),
        }
    }
}

/// The three configured sub-agents the router selects between.
#[derive(Debug, Clone)]
pub struct AgentSet {
    pub researcher: AgentProfile,
    pub clarifier: AgentProfile,
    pub asker: AgentProfile,
}

impl AgentSet {
    pub fn standard() -> Self {
        Self {
            researcher: AgentProfile::researcher(),
            clarifier: AgentProfile::clarifier(),
            asker: AgentProfile::asker(),
        }
    }
}

impl Default for AgentSet {
    fn default() -> Self {
        Self::standard()
    }
}
