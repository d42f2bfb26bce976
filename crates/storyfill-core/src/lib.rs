//! Storyfill Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the game
//! engine, the storage backend, and the transport adapter depend on.
//! It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod render;
pub mod repository;
pub mod rng;
pub mod types;
