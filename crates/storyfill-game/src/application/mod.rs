//! Application layer: session store, countdown scheduling, and handlers.

pub mod command_handlers;
pub mod countdown;
pub mod query_handlers;
pub mod services;
pub mod session_store;
