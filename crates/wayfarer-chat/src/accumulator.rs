//! Per-turn stream accumulator.
//!
//! Folds streamed fragments into a single assistant message and drives the
//! turn through its states:
//! Idle -> Streaming -> Finalizing -> Done, with Errored reachable from any
//! non-terminal state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::transcript::Transcript;
use crate::types::{Message, MessageId};

/// Lifecycle of one assistant reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorState {
    Idle,
    Streaming,
    Finalizing,
    Done,
    Errored,
}

impl fmt::Display for AccumulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccumulatorState::Idle => "idle",
            AccumulatorState::Streaming => "streaming",
            AccumulatorState::Finalizing => "finalizing",
            AccumulatorState::Done => "done",
            AccumulatorState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Validate that a state transition is allowed.
///
/// Valid transitions:
/// - Idle -> Streaming (first fragment)
/// - Streaming -> Streaming (further fragments)
/// - Idle -> Finalizing (stream ended without fragments)
/// - Streaming -> Finalizing
/// - Finalizing -> Done
/// - Idle/Streaming/Finalizing -> Errored
pub fn validate_transition(from: AccumulatorState, to: AccumulatorState) -> Result<(), ChatError> {
    use AccumulatorState::*;

    let valid = matches!(
        (from, to),
        (Idle, Streaming)
            | (Streaming, Streaming)
            | (Idle, Finalizing)
            | (Streaming, Finalizing)
            | (Finalizing, Done)
            | (Idle, Errored)
            | (Streaming, Errored)
            | (Finalizing, Errored)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// Accumulates one turn's fragments into a transcript message.
pub struct StreamAccumulator<'t> {
    transcript: &'t Transcript,
    state: AccumulatorState,
    message_id: Option<MessageId>,
    buffer: String,
    fragments: usize,
}

impl<'t> StreamAccumulator<'t> {
    pub fn new(transcript: &'t Transcript) -> Self {
        Self {
            transcript,
            state: AccumulatorState::Idle,
            message_id: None,
            buffer: String::new(),
            fragments: 0,
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Id of the assistant message, once the first fragment has arrived.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Append a fragment. The first one creates the streaming message; later
    /// ones rewrite its text with the full accumulation.
    pub fn push(&mut self, fragment: &str) -> Result<Message, ChatError> {
        validate_transition(self.state, AccumulatorState::Streaming)?;
        self.buffer.push_str(fragment);
        self.fragments += 1;

        let message = match self.message_id {
            None => {
                let message = self.transcript.begin_streaming(self.buffer.clone())?;
                self.message_id = Some(message.id);
                message
            }
            Some(id) => self.rewrite(id, |m, text| m.text = text)?,
        };
        self.state = AccumulatorState::Streaming;
        Ok(message)
    }

    /// The stream ended. Returns the full accumulated text for extraction.
    ///
    /// An empty stream still opens a (blank) message so it can be finalized.
    pub fn complete(&mut self) -> Result<&str, ChatError> {
        validate_transition(self.state, AccumulatorState::Finalizing)?;
        if self.message_id.is_none() {
            let message = self.transcript.begin_streaming(String::new())?;
            self.message_id = Some(message.id);
        }
        self.state = AccumulatorState::Finalizing;
        Ok(&self.buffer)
    }

    /// Replace the message text with `display_text` and stop streaming.
    pub fn finalize(&mut self, display_text: &str) -> Result<Message, ChatError> {
        validate_transition(self.state, AccumulatorState::Done)?;
        let id = self
            .message_id
            .ok_or(ChatError::InvalidTransition(self.state, AccumulatorState::Done))?;
        let message = self.rewrite(id, |m, _| {
            m.text = display_text.to_string();
            m.is_streaming = false;
        })?;
        self.state = AccumulatorState::Done;
        Ok(message)
    }

    /// Record a failed turn.
    ///
    /// With a message already open, its text becomes `error_text` if nothing
    /// had been shown yet, or keeps the partial text with the error appended.
    /// Without one, a new error message is appended.
    pub fn fail(&mut self, error_text: &str) -> Result<Message, ChatError> {
        validate_transition(self.state, AccumulatorState::Errored)?;
        let message = match self.message_id {
            Some(id) => self.rewrite(id, |m, partial| {
                m.text = if partial.is_empty() {
                    error_text.to_string()
                } else {
                    format!("{partial}\n\n{error_text}")
                };
                m.is_streaming = false;
                m.is_error = true;
            })?,
            None => {
                let message = self.transcript.append_error(error_text);
                self.message_id = Some(message.id);
                message
            }
        };
        self.state = AccumulatorState::Errored;
        Ok(message)
    }

    fn rewrite(
        &self,
        id: MessageId,
        edit: impl FnOnce(&mut Message, String),
    ) -> Result<Message, ChatError> {
        let text = self.buffer.clone();
        self.transcript
            .update_streaming(id, |m| edit(m, text))
            .ok_or(ChatError::InvalidTransition(self.state, self.state))
    }
}
