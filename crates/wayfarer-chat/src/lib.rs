//! Travel assistant chat for Wayfarer.
//!
//! Streams assistant replies into a transcript, lifts embedded
//! `AI_ADD_SPOT` commands out of them, and applies those commands to the
//! session's itinerary.

pub mod accumulator;
pub mod backend;
pub mod command;
pub mod datetime;
pub mod error;
pub mod gemini;
pub mod mutator;
pub mod prompt;
pub mod session;
pub mod transcript;
pub mod types;

pub use accumulator::{AccumulatorState, StreamAccumulator};
pub use backend::{ChatBackend, FragmentStream, ScriptedBackend, ScriptedReply, TurnRequest};
pub use command::{CommandExtractor, DATETIME_UNSPECIFIED};
pub use datetime::DateNormalizer;
pub use error::ChatError;
pub use gemini::GeminiBackend;
pub use mutator::ItineraryMutator;
pub use session::{ChatSession, SessionState};
pub use transcript::Transcript;
pub use types::{
    ConversationTurn, Extraction, Message, MessageId, NormalizedDateTime, Role, Sender,
    SessionEvent, SpotCommand, TurnOutcome,
};
