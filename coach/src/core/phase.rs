//! Deterministic phase derivation for the router.

use crate::core::state::SessionState;

/// The four phases of a coaching session, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No research has been gathered yet.
    NeedsResearch,
    /// Research exists but the user has not been reassured.
    NeedsReassurance,
    /// Reassured but not yet presented with detached options.
    NeedsOptions,
    /// Both flags set; the session only emits its closing message.
    Done,
}

/// Derive the current phase from session state.
///
/// Conditions are checked in fixed order and the first unmet one wins, so a
/// session can never re-enter an earlier phase as long as `research` is
/// append-only and the flags are monotonic.
pub fn phase_for(state: &SessionState) -> Phase {
    if state.research.is_empty() {
        return Phase::NeedsResearch;
    }
    if !state.user_understood_fear {
        return Phase::NeedsReassurance;
    }
    if !state.user_detached {
        return Phase::NeedsOptions;
    }
    Phase::Done
}
