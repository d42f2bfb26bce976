//! Pure game rules and the session aggregate.

pub mod commands;
pub mod options;
pub mod plan;
pub mod result;
pub mod session;
pub mod text;
