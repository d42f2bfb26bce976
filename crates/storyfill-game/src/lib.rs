//! Storyfill: game orchestration engine.
//!
//! Responsible for the lobby countdown, turn-by-turn questioning,
//! anti-duplicate option selection, and assembling the final story,
//! on top of a cached, write-through session store.

pub mod application;
pub mod domain;
pub mod settings;
