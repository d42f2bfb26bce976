//! Storyfill API: HTTP transport and process shell.
//!
//! Exposes the route tree and shared state so the binary and the
//! integration tests build the same application.

pub mod config;
pub mod error;
pub mod outbox;
pub mod routes;
pub mod state;
