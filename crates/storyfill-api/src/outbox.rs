//! In-process render outbox drained by the chat gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use storyfill_core::error::DomainError;
use storyfill_core::render::{Render, RenderSink};
use storyfill_core::types::{ChatId, RenderAnchor};
use tracing::{debug, warn};

/// Renders kept per chat before the oldest are dropped.
pub const MAX_PENDING_PER_CHAT: usize = 256;

/// One render waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundRender {
    /// Handle of the message showing this render.
    pub message_id: RenderAnchor,
    /// Whether the gateway edits `message_id` rather than posting it.
    pub edits: bool,
    /// What to display.
    pub render: Render,
}

#[derive(Debug, Default)]
struct OutboxState {
    last_message_id: RenderAnchor,
    queues: HashMap<ChatId, VecDeque<OutboundRender>>,
}

/// `RenderSink` that queues renders per chat and hands out message
/// handles for new messages.
#[derive(Debug, Default)]
pub struct RenderOutbox {
    state: Mutex<OutboxState>,
}

impl RenderOutbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued render for `chat_id`, oldest first.
    pub fn drain(&self, chat_id: ChatId) -> Vec<OutboundRender> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .queues
            .remove(&chat_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Number of renders queued for `chat_id`.
    pub fn pending(&self, chat_id: ChatId) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.queues.get(&chat_id).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl RenderSink for RenderOutbox {
    async fn render(
        &self,
        chat_id: ChatId,
        anchor: Option<RenderAnchor>,
        render: &Render,
    ) -> Result<Option<RenderAnchor>, DomainError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (message_id, edits) = match anchor {
            Some(existing) => (existing, true),
            None => {
                state.last_message_id += 1;
                (state.last_message_id, false)
            }
        };

        let queue = state.queues.entry(chat_id).or_default();
        if queue.len() >= MAX_PENDING_PER_CHAT {
            queue.pop_front();
            warn!(chat_id, "render outbox full, dropped oldest render");
        }
        queue.push_back(OutboundRender {
            message_id,
            edits,
            render: render.clone(),
        });
        debug!(chat_id, message_id, edits, kind = render.kind(), "render queued");

        Ok(Some(message_id))
    }
}
