//! Chat session: one conversation with the assistant, wired to the
//! itinerary it can edit.
//!
//! A turn appends the user message, streams the reply into a single
//! assistant message, then strips any embedded spot command, applies it,
//! and confirms it. Only one turn may be in flight at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wayfarer_core::config::AssistantConfig;
use wayfarer_core::{Itinerary, Spot};

use crate::accumulator::{AccumulatorState, StreamAccumulator};
use crate::backend::{ChatBackend, TurnRequest};
use crate::command::CommandExtractor;
use crate::datetime::DateNormalizer;
use crate::error::ChatError;
use crate::gemini::GeminiBackend;
use crate::mutator::ItineraryMutator;
use crate::prompt;
use crate::transcript::Transcript;
use crate::types::{ConversationTurn, Extraction, Role, Sender, SessionEvent, TurnOutcome};

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 256;

/// Shown in the transcript when the session starts without an API key.
pub const UNAVAILABLE_MESSAGE: &str = "AI Chat is unavailable: API Key not configured.";

/// Shown in the transcript when the assistant is switched off in config.
pub const TURNED_OFF_MESSAGE: &str = "AI Chat is turned off in the configuration.";

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Disabled,
    Disposed,
}

/// One conversation with the assistant.
pub struct ChatSession {
    id: Uuid,
    config: AssistantConfig,
    system_instruction: String,
    backend: Option<Arc<dyn ChatBackend>>,
    state: Mutex<SessionState>,
    transcript: Transcript,
    itinerary: Arc<Itinerary>,
    history: Mutex<Vec<ConversationTurn>>,
    in_flight: AtomicBool,
    turns: AtomicU64,
    banner: Mutex<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    /// Start a session from configuration.
    ///
    /// Reads the API key from the configured environment variable. Without
    /// one (or with the assistant switched off) the session is disabled.
    pub fn from_config(config: AssistantConfig, itinerary: Arc<Itinerary>) -> Self {
        if !config.enabled {
            info!("Assistant disabled by configuration");
            return Self::disabled(config, itinerary, TURNED_OFF_MESSAGE, None);
        }
        match config.read_api_key() {
            Some(key) => {
                let backend = GeminiBackend::new(SecretString::from(key), config.base_url.clone());
                Self::with_backend(config, Arc::new(backend), itinerary)
            }
            None => {
                let banner = config.missing_key_banner();
                warn!(env = %config.api_key_env, "API key not configured, chat disabled");
                Self::disabled(config, itinerary, UNAVAILABLE_MESSAGE, Some(banner))
            }
        }
    }

    /// Start an active session over `backend` and post the welcome message.
    pub fn with_backend(
        config: AssistantConfig,
        backend: Arc<dyn ChatBackend>,
        itinerary: Arc<Itinerary>,
    ) -> Self {
        let session = Self::build(config, Some(backend), itinerary, SessionState::Active);
        session
            .transcript
            .append(Sender::Assistant, session.config.welcome_message());
        info!(
            session_id = %session.id,
            model = %session.config.model,
            "Chat session started"
        );
        session
    }

    fn disabled(
        config: AssistantConfig,
        itinerary: Arc<Itinerary>,
        message: &str,
        banner: Option<String>,
    ) -> Self {
        let session = Self::build(config, None, itinerary, SessionState::Disabled);
        session.transcript.append(Sender::Assistant, message);
        *session.lock_banner() = banner;
        session
    }

    fn build(
        config: AssistantConfig,
        backend: Option<Arc<dyn ChatBackend>>,
        itinerary: Arc<Itinerary>,
        state: SessionState,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            system_instruction: prompt::system_instruction(&config.destination),
            config,
            backend,
            state: Mutex::new(state),
            transcript: Transcript::new(),
            itinerary,
            history: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            turns: AtomicU64::new(0),
            banner: Mutex::new(None),
            events,
        }
    }

    // -- Accessors --

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn itinerary(&self) -> &Arc<Itinerary> {
        &self.itinerary
    }

    /// Persistent notice for the user (missing key, last turn's error).
    pub fn banner(&self) -> Option<String> {
        self.lock_banner().clone()
    }

    /// Whether a turn is currently streaming.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Completed exchanges remembered for context.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.lock_history().clone()
    }

    /// Subscribe to transcript, itinerary, and turn events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// End the session. Later sends fail with [`ChatError::Disposed`].
    pub fn dispose(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::Disposed;
        self.lock_history().clear();
        info!(session_id = %self.id, "Chat session disposed");
    }

    // -- Turns --

    /// Send `user_text` with the current `itinerary` as context and stream
    /// the reply.
    ///
    /// Rejected without side effects when the text is blank, a turn is
    /// already in flight, or the session is disabled or disposed. A
    /// transport failure is recorded in the transcript and the banner, then
    /// returned; the session stays usable.
    pub async fn send(&self, user_text: &str, itinerary: &[Spot]) -> Result<TurnOutcome, ChatError> {
        let backend = self.ensure_active()?;
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = TurnGuard::acquire(&self.in_flight)?;

        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        *self.lock_banner() = None;

        let user_message = self.transcript.append(Sender::User, user_text);
        self.emit(SessionEvent::MessageAppended {
            message: user_message,
        });

        let outgoing = prompt::compose_message(user_text, itinerary);
        let request = TurnRequest {
            model: self.config.model.clone(),
            system_instruction: self.system_instruction.clone(),
            history: self.history(),
            message: outgoing.clone(),
        };
        info!(
            session_id = %self.id,
            turn,
            backend = backend.name(),
            itinerary_spots = itinerary.len(),
            "Turn started"
        );

        let mut fragments = backend.stream_turn(request);
        let mut acc = StreamAccumulator::new(&self.transcript);

        while let Some(item) = fragments.next().await {
            let fragment = match item {
                Ok(fragment) => fragment,
                Err(e) => return Err(self.fail_turn(&mut acc, turn, e)),
            };
            let first = acc.state() == AccumulatorState::Idle;
            let message = match acc.push(&fragment) {
                Ok(message) => message,
                Err(e) => return Err(self.fail_turn(&mut acc, turn, e)),
            };
            self.emit(if first {
                SessionEvent::MessageAppended { message }
            } else {
                SessionEvent::MessageUpdated { message }
            });
        }

        let empty_stream = acc.message_id().is_none();
        let raw = acc.complete()?.to_string();
        if empty_stream {
            if let Some(message) = acc.message_id().and_then(|id| self.transcript.get(id)) {
                self.emit(SessionEvent::MessageAppended { message });
            }
        }
        debug!(
            session_id = %self.id,
            turn,
            fragments = acc.fragment_count(),
            chars = raw.len(),
            "Stream complete"
        );

        let outcome = match self.apply_reply(&mut acc, &raw) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail_turn(&mut acc, turn, e)),
        };

        self.lock_history().extend([
            ConversationTurn {
                role: Role::User,
                text: outgoing,
            },
            ConversationTurn {
                role: Role::Model,
                text: raw,
            },
        ]);

        info!(
            session_id = %self.id,
            turn,
            spot_added = outcome.spot.is_some(),
            adjusted = outcome.adjusted,
            "Turn completed"
        );
        self.emit(SessionEvent::TurnCompleted {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Extract and apply any command, then finalize the reply message.
    fn apply_reply(
        &self,
        acc: &mut StreamAccumulator<'_>,
        raw: &str,
    ) -> Result<TurnOutcome, ChatError> {
        match CommandExtractor::extract(raw) {
            Extraction::PlainText(text) => {
                let message = acc.finalize(&text)?;
                let message_id = message.id;
                self.emit(SessionEvent::MessageUpdated { message });
                Ok(TurnOutcome {
                    message_id,
                    display_text: text,
                    spot: None,
                    adjusted: false,
                })
            }
            Extraction::Command {
                command,
                display_text,
            } => {
                let date_time = DateNormalizer::normalize(&command.raw_date_time);
                let (spot, confirmation) =
                    ItineraryMutator::new(&self.itinerary, &self.transcript)
                        .add(&command, &date_time)?;

                let message = acc.finalize(&display_text)?;
                let message_id = message.id;
                self.emit(SessionEvent::MessageUpdated { message });
                self.emit(SessionEvent::SpotAdded { spot: spot.clone() });
                self.emit(SessionEvent::MessageAppended {
                    message: confirmation,
                });

                Ok(TurnOutcome {
                    message_id,
                    display_text,
                    spot: Some(spot),
                    adjusted: date_time.adjusted,
                })
            }
        }
    }

    /// Record a failed turn in the transcript and banner, returning the error.
    fn fail_turn(&self, acc: &mut StreamAccumulator<'_>, turn: u64, error: ChatError) -> ChatError {
        let text = error_text(&error);
        warn!(session_id = %self.id, turn, error = %error, "Turn failed");

        let had_message = acc.message_id().is_some();
        match acc.fail(&text) {
            Ok(message) => self.emit(if had_message {
                SessionEvent::MessageUpdated { message }
            } else {
                SessionEvent::MessageAppended { message }
            }),
            Err(e) => warn!(error = %e, "Could not record turn failure"),
        }

        *self.lock_banner() = Some(text.clone());
        self.emit(SessionEvent::TurnFailed { error: text });
        error
    }

    // -- Private helpers --

    fn ensure_active(&self) -> Result<&Arc<dyn ChatBackend>, ChatError> {
        match self.state() {
            SessionState::Disposed => Err(ChatError::Disposed),
            SessionState::Disabled => Err(ChatError::Disabled),
            SessionState::Active => self.backend.as_ref().ok_or(ChatError::Disabled),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock_banner(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.banner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<ConversationTurn>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// User-facing text for a failed turn.
pub fn error_text(error: &ChatError) -> String {
    let detail = match error {
        ChatError::Transport(message) if !message.trim().is_empty() => message.clone(),
        ChatError::Transport(_) => "Could not get a response.".to_string(),
        other => other.to_string(),
    };
    format!("AI Error: {detail}")
}

/// Holds the single in-flight slot for the duration of a turn.
struct TurnGuard<'a>(&'a AtomicBool);

impl<'a> TurnGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ChatError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatError::TurnInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
