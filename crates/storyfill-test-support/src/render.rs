//! Test render sink: records every render it is handed.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use storyfill_core::error::DomainError;
use storyfill_core::render::{Render, RenderSink};
use storyfill_core::types::{ChatId, RenderAnchor};

#[derive(Debug, Clone)]
struct RecordedRender {
    chat_id: ChatId,
    anchor: Option<RenderAnchor>,
    render: Render,
    handle: RenderAnchor,
}

/// A render sink that records calls and hands out message handles.
///
/// Edits return the anchor they edited; new messages get the next
/// handle from a counter. It can be switched to fail every delivery.
#[derive(Debug, Default)]
pub struct RecordingRenderSink {
    calls: Mutex<Vec<RecordedRender>>,
    next_handle: AtomicI64,
    failing: AtomicBool,
}

impl RecordingRenderSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The `(anchor, render)` pairs delivered to `chat_id`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls_for(&self, chat_id: ChatId) -> Vec<(Option<RenderAnchor>, Render)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.chat_id == chat_id)
            .map(|call| (call.anchor, call.render.clone()))
            .collect()
    }

    /// The kinds of renders delivered to `chat_id`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn kinds_for(&self, chat_id: ChatId) -> Vec<String> {
        self.calls_for(chat_id)
            .iter()
            .map(|(_, render)| render.kind().to_owned())
            .collect()
    }

    /// The handle returned for the last delivery to `chat_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_anchor(&self, chat_id: ChatId) -> Option<RenderAnchor> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|call| call.chat_id == chat_id)
            .map(|call| call.handle)
    }
}

#[async_trait]
impl RenderSink for RecordingRenderSink {
    async fn render(
        &self,
        chat_id: ChatId,
        anchor: Option<RenderAnchor>,
        render: &Render,
    ) -> Result<Option<RenderAnchor>, DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("transport unavailable".into()));
        }
        let handle = anchor.unwrap_or_else(|| self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().push(RecordedRender {
            chat_id,
            anchor,
            render: render.clone(),
            handle,
        });
        Ok(Some(handle))
    }
}
