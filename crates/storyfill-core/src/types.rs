//! Identity types supplied by the chat transport.

/// External identity of a chat (group) hosting at most one session.
pub type ChatId = i64;

/// External identity of a player, unique within a session.
pub type PlayerId = i64;

/// Opaque handle to a rendered message, owned by the transport.
pub type RenderAnchor = i64;
