//! Error types for the chat pipeline.

use wayfarer_core::error::WayfarerError;

use crate::accumulator::AccumulatorState;

/// Errors from the chat session.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("chat session has been disposed")]
    Disposed,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a turn is already in flight")]
    TurnInFlight,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("deserialization error: {0}")]
    Deserialization(String),
    #[error("invalid stream transition: {0} -> {1}")]
    InvalidTransition(AccumulatorState, AccumulatorState),
    #[error("itinerary error: {0}")]
    Core(#[from] WayfarerError),
}
