//! Scripted emotional-coaching dialogue driven by a fixed-step router.
//!
//! A router walks one user session through four phases — research,
//! reassurance, options, completion — by delegating each turn to one of three
//! model-backed sub-agents (researcher, clarifier, asker). The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (session state, phase
//!   derivation, events). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (model client, search
//!   provider, config, prompt rendering). Behind traits to enable scripted
//!   fakes in tests.
//!
//! Orchestration modules ([`turn`], [`agents`], [`tools`]) coordinate core
//! logic with I/O; [`session`] owns the per-conversation state the router
//! reads on every turn.

pub mod agents;
pub mod core;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
pub mod turn;
