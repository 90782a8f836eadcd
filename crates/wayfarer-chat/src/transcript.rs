//! Session-scoped chat transcript.
//!
//! Append-only list of messages with one exception: the message that is
//! currently streaming may be edited in place until it is finalized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::error::ChatError;
use crate::types::{Message, MessageId, Sender};

/// Ordered list of chat messages.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: RwLock<Arc<Vec<Message>>>,
    next_id: AtomicU64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished message.
    pub fn append(&self, sender: Sender, text: impl Into<String>) -> Message {
        self.push(sender, text.into(), false, false)
    }

    /// Append a finished error message from the assistant.
    pub fn append_error(&self, text: impl Into<String>) -> Message {
        self.push(Sender::Assistant, text.into(), false, true)
    }

    /// Open a new streaming assistant message with `text` as its first content.
    ///
    /// Fails if another message is still streaming.
    pub fn begin_streaming(&self, text: impl Into<String>) -> Result<Message, ChatError> {
        let mut guard = self.messages.write().unwrap_or_else(|e| e.into_inner());
        if guard.iter().any(|m| m.is_streaming) {
            return Err(ChatError::TurnInFlight);
        }
        let message = self.allocate(Sender::Assistant, text.into(), true, false);
        let mut next: Vec<Message> = (**guard).clone();
        next.push(message.clone());
        *guard = Arc::new(next);
        Ok(message)
    }

    /// Edit the streaming message with `id`.
    ///
    /// Returns `None` when the message does not exist or has already been
    /// finalized; finalized messages are immutable.
    pub fn update_streaming(
        &self,
        id: MessageId,
        edit: impl FnOnce(&mut Message),
    ) -> Option<Message> {
        let mut guard = self.messages.write().unwrap_or_else(|e| e.into_inner());
        let pos = guard.iter().position(|m| m.id == id && m.is_streaming)?;
        let mut next: Vec<Message> = (**guard).clone();
        edit(&mut next[pos]);
        let updated = next[pos].clone();
        *guard = Arc::new(next);
        Some(updated)
    }

    /// The message currently streaming, if any.
    pub fn streaming(&self) -> Option<Message> {
        self.read().iter().find(|m| m.is_streaming).cloned()
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.read().iter().find(|m| m.id == id).cloned()
    }

    pub fn last(&self) -> Option<Message> {
        self.read().last().cloned()
    }

    /// Snapshot of every message in order.
    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        Arc::clone(&*self.read())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // -- Private helpers --

    fn read(&self) -> RwLockReadGuard<'_, Arc<Vec<Message>>> {
        self.messages.read().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate(&self, sender: Sender, text: String, is_streaming: bool, is_error: bool) -> Message {
        Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            text,
            sender,
            is_streaming,
            is_error,
        }
    }

    fn push(&self, sender: Sender, text: String, is_streaming: bool, is_error: bool) -> Message {
        let message = self.allocate(sender, text, is_streaming, is_error);
        let mut guard = self.messages.write().unwrap_or_else(|e| e.into_inner());
        let mut next: Vec<Message> = (**guard).clone();
        next.push(message.clone());
        *guard = Arc::new(next);
        message
    }
}
