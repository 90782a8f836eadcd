//! Terminal rendering of session events and the itinerary.
//!
//! Streaming replies are printed incrementally: each update prints only the
//! characters not yet on screen. When finalization rewrites the text (a
//! spot command was stripped), the clean reply is printed again in full.

use std::io::Write;

use wayfarer_chat::{Message, MessageId, Sender, SessionEvent};
use wayfarer_core::{parse_canonical, Spot};

/// Prints session events to a writer.
pub struct TerminalView<W: Write> {
    out: W,
    /// Streaming message currently on screen and how much of it is printed.
    live: Option<(MessageId, String)>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, live: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one event.
    pub fn render(&mut self, event: &SessionEvent) -> std::io::Result<()> {
        match event {
            SessionEvent::MessageAppended { message } => self.appended(message),
            SessionEvent::MessageUpdated { message } => self.updated(message),
            SessionEvent::SpotAdded { spot } => {
                writeln!(self.out, "  + {}", spot_line(spot))
            }
            SessionEvent::TurnCompleted { .. } | SessionEvent::TurnFailed { .. } => self.out.flush(),
        }
    }

    /// Print a message in full, e.g. the opening transcript entry.
    pub fn message(&mut self, message: &Message) -> std::io::Result<()> {
        writeln!(self.out, "{}> {}", label(message), message.text)
    }

    /// Print the itinerary with 1-based positions.
    pub fn itinerary(&mut self, spots: &[Spot]) -> std::io::Result<()> {
        if spots.is_empty() {
            return writeln!(self.out, "Your itinerary is empty.");
        }
        for (i, spot) in spots.iter().enumerate() {
            writeln!(self.out, "{:>3}. {}", i + 1, spot_line(spot))?;
        }
        Ok(())
    }

    pub fn notice(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "! {text}")
    }

    fn appended(&mut self, message: &Message) -> std::io::Result<()> {
        if message.sender == Sender::User {
            return Ok(());
        }
        if message.is_streaming {
            write!(self.out, "{}> {}", label(message), message.text)?;
            self.live = Some((message.id, message.text.clone()));
            return self.out.flush();
        }
        self.message(message)
    }

    fn updated(&mut self, message: &Message) -> std::io::Result<()> {
        let Some((id, printed)) = self.live.take() else {
            return self.message(message);
        };
        if id != message.id {
            self.live = Some((id, printed));
            return self.message(message);
        }

        match message.text.strip_prefix(printed.as_str()) {
            Some(rest) => write!(self.out, "{rest}")?,
            None => {
                writeln!(self.out)?;
                write!(self.out, "{}> {}", label(message), message.text)?;
            }
        }

        if message.is_streaming {
            self.live = Some((id, message.text.clone()));
            self.out.flush()
        } else {
            writeln!(self.out)
        }
    }
}

fn label(message: &Message) -> &'static str {
    match (message.sender, message.is_error) {
        (Sender::User, _) => "you",
        (Sender::Assistant, false) => "assistant",
        (Sender::Assistant, true) => "error",
    }
}

/// `Kinkaku-ji, Jul 17, 2024 09:00 AM by bus (Zen Buddhist temple...)`
fn spot_line(spot: &Spot) -> String {
    let when = parse_canonical(&spot.date_time)
        .map(|dt| dt.format("%b %-d, %Y %I:%M %p").to_string())
        .unwrap_or_else(|| spot.date_time.clone());
    let mut line = format!("{}, {} by {}", spot.name, when, spot.transport_mode.label());
    if !spot.description.is_empty() {
        line.push_str(&format!(" ({})", spot.description));
    }
    line
}
