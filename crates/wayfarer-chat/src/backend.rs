//! Chat backend abstraction.
//!
//! A backend turns one request into a stream of text fragments. The
//! session owns the accumulation, extraction, and error reporting; a
//! backend only has to move bytes.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_util::Stream;
use tokio::sync::Notify;

use crate::error::ChatError;
use crate::types::ConversationTurn;

/// Stream of reply fragments, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send + 'static>>;

/// Everything a backend needs to produce one reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnRequest {
    pub model: String,
    pub system_instruction: String,
    /// Earlier exchanges of this session, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The outgoing user message, itinerary context included.
    pub message: String,
}

/// Streaming chat completion backend.
///
/// Returns a boxed stream so the trait stays object-safe. Connection
/// failures surface as the first stream item.
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name (e.g. "gemini").
    fn name(&self) -> &str;

    fn stream_turn(&self, request: TurnRequest) -> FragmentStream;
}

// =============================================================================
// ScriptedBackend
// =============================================================================

/// One pre-recorded reply.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    /// Yield each fragment, then end.
    Fragments(Vec<String>),
    /// Yield the fragments, then fail with a transport error.
    Fail {
        fragments: Vec<String>,
        error: String,
    },
    /// Wait for the gate before yielding the fragments.
    Gated {
        fragments: Vec<String>,
        gate: Arc<Notify>,
    },
}

/// Backend that replays canned replies in order and records every request.
///
/// Used by tests and offline demos. Running out of replies is reported as a
/// transport error.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply made of `fragments`.
    pub fn reply<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedReply::Fragments(collect(fragments)))
    }

    /// Queue a reply that fails with `error` after yielding `fragments`.
    pub fn fail<I, S>(self, fragments: I, error: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedReply::Fail {
            fragments: collect(fragments),
            error: error.into(),
        })
    }

    /// Queue a reply that blocks until `gate` is notified.
    pub fn gated<I, S>(self, fragments: I, gate: Arc<Notify>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedReply::Gated {
            fragments: collect(fragments),
            gate,
        })
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn push(self, reply: ScriptedReply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }
}

impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream_turn(&self, request: TurnRequest) -> FragmentStream {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        Box::pin(async_stream::try_stream! {
            match next {
                Some(ScriptedReply::Fragments(fragments)) => {
                    for fragment in fragments {
                        yield fragment;
                    }
                }
                Some(ScriptedReply::Fail { fragments, error }) => {
                    for fragment in fragments {
                        yield fragment;
                    }
                    Err::<(), _>(ChatError::Transport(error))?;
                }
                Some(ScriptedReply::Gated { fragments, gate }) => {
                    gate.notified().await;
                    for fragment in fragments {
                        yield fragment;
                    }
                }
                None => {
                    Err::<(), _>(ChatError::Transport("no scripted reply left".to_string()))?;
                }
            }
        })
    }
}

fn collect<I, S>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fragments.into_iter().map(Into::into).collect()
}
