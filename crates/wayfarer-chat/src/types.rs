//! Transcript, command, and event types for the chat pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use wayfarer_core::{Spot, TransportMode};

// =============================================================================
// Transcript
// =============================================================================

/// Transcript message id. Allocated from a per-transcript counter, so ids
/// order by creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{:06}", self.0)
    }
}

/// Who authored a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in the chat transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    /// Still receiving fragments. At most one message has this set.
    pub is_streaming: bool,
    pub is_error: bool,
}

// =============================================================================
// Command protocol
// =============================================================================

/// An `AI_ADD_SPOT` command lifted out of assistant text.
///
/// Ephemeral: consumed once by the date normalizer and the itinerary mutator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotCommand {
    pub name: String,
    pub description: String,
    pub raw_date_time: String,
    pub transport_mode: TransportMode,
}

/// Result of scanning a finalized assistant message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// A well-formed command was found; `display_text` has the token removed.
    Command {
        command: SpotCommand,
        display_text: String,
    },
    /// No command; the text is shown as-is.
    PlainText(String),
}

impl Extraction {
    /// The text that should be shown to the user.
    pub fn display_text(&self) -> &str {
        match self {
            Extraction::Command { display_text, .. } => display_text,
            Extraction::PlainText(text) => text,
        }
    }
}

/// A date/time after normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDateTime {
    /// Canonical `YYYY-MM-DDTHH:MM` local time.
    pub canonical: String,
    /// The value was substituted or reformatted from what the assistant sent.
    pub adjusted: bool,
}

// =============================================================================
// Turns and events
// =============================================================================

/// Role of a prior exchange sent back to the backend as context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One side of a completed exchange within the current session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

/// What a completed turn produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The assistant message this turn streamed into.
    pub message_id: MessageId,
    pub display_text: String,
    /// Spot added by an embedded command, if any.
    pub spot: Option<Spot>,
    /// Whether the added spot's date/time was substituted or reformatted.
    pub adjusted: bool,
}

/// Observable changes emitted by a chat session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended { message: Message },
    MessageUpdated { message: Message },
    SpotAdded { spot: Spot },
    TurnCompleted { outcome: TurnOutcome },
    TurnFailed { error: String },
}
