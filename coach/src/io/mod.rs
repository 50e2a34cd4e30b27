//! Side-effecting collaborators and their trait seams.

pub mod config;
pub mod model;
pub mod prompt;
pub mod search;
