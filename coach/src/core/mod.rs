//! Pure, deterministic session logic.
//!
//! Nothing in this module performs I/O. Phase derivation is a pure function
//! of [`state::SessionState`], which makes every routing decision
//! reproducible from durable state alone.

pub mod event;
pub mod phase;
pub mod state;
