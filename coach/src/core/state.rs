//! Shared mutable state for one coaching session.
//!
//! The state is the single source of truth for routing: the router derives
//! the current phase from these fields on every turn and never keeps private
//! bookkeeping of its own. Mutation happens exclusively through the methods
//! below, which encode the per-field invariants.

use serde::{Deserialize, Serialize};

/// Accumulated state for one conversation.
///
/// Fields absent from a serialized form deserialize to empty/false, so a
/// freshly created or partially persisted session always reads as "nothing
/// has happened yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Search-result text blocks. Append-only within a session.
    pub research: Vec<String>,
    /// Actionable options for the user. Replaced wholesale on each save.
    pub options: Vec<String>,
    /// Set after the reassurance phase completes. Monotonic.
    pub user_understood_fear: bool,
    /// Set after the options phase completes. Monotonic.
    pub user_detached: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one formatted research block. Nothing ever removes blocks.
    pub fn append_research(&mut self, block: impl Into<String>) {
        self.research.push(block.into());
    }

    /// Replace the options list wholesale.
    pub fn replace_options(&mut self, options: Vec<String>) {
        self.options = options;
    }

    /// Mark the reassurance phase complete. There is no inverse operation.
    pub fn mark_understood(&mut self) {
        self.user_understood_fear = true;
    }

    /// Mark the options phase complete. There is no inverse operation.
    pub fn mark_detached(&mut self) {
        self.user_detached = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty_and_unflagged() {
        let state = SessionState::new();
        assert!(state.research.is_empty());
        assert!(state.options.is_empty());
        assert!(!state.user_understood_fear);
        assert!(!state.user_detached);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let state: SessionState = serde_json::from_str("{}").expect("parse");
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn research_appends_in_order() {
        let mut state = SessionState::new();
        state.append_research("first");
        state.append_research("second");
        assert_eq!(state.research, vec!["first", "second"]);
    }

    #[test]
    fn options_are_replaced_not_appended() {
        let mut state = SessionState::new();
        state.replace_options(vec!["a".to_string(), "b".to_string()]);
        state.replace_options(vec!["c".to_string()]);
        assert_eq!(state.options, vec!["c"]);
    }
}
