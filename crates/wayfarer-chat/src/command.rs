//! `AI_ADD_SPOT` command extraction.
//!
//! The assistant asks the app to add a spot by embedding a single line of
//! the form
//!
//! ```text
//! AI_ADD_SPOT::name=<n>;;description=<d>;;dateTime=<t>;;transportMode=<mode>[;;]
//! ```
//!
//! anywhere in its reply. The first well-formed occurrence is lifted out and
//! the remaining prose becomes the visible reply.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use wayfarer_core::TransportMode;

use crate::types::{Extraction, SpotCommand};

/// Command keyword that starts a spot-add token.
pub const ADD_SPOT_KEYWORD: &str = "AI_ADD_SPOT::";

/// Sentinel the assistant uses when the user gave no date or time.
pub const DATETIME_UNSPECIFIED: &str = "DATETIME_UNSPECIFIED";

/// A field value is the shortest run, newlines included, that lets the rest
/// of the token match. A value may end in a single `;`.
const FIELD: &str = r"(.*?)";

static ADD_SPOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let modes = TransportMode::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?s)AI_ADD_SPOT::name={FIELD};;description={FIELD};;dateTime={FIELD};;transportMode=({modes})\b(?:;;)?"
    );
    Regex::new(&pattern).expect("Invalid AI_ADD_SPOT regex")
});

/// Scans finalized assistant text for an embedded spot command.
pub struct CommandExtractor;

impl CommandExtractor {
    /// Extract the first well-formed command from `text`.
    ///
    /// Malformed tokens (unknown mode, missing field, wrong order) are left
    /// in place and the whole text is returned as [`Extraction::PlainText`].
    pub fn extract(text: &str) -> Extraction {
        let Some(caps) = ADD_SPOT_PATTERN.captures(text) else {
            return Extraction::PlainText(text.to_string());
        };

        let Some(whole) = caps.get(0) else {
            return Extraction::PlainText(text.to_string());
        };
        let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

        let transport_mode = match field(4).parse::<TransportMode>() {
            Ok(mode) => mode,
            Err(_) => return Extraction::PlainText(text.to_string()),
        };

        let command = SpotCommand {
            name: field(1).to_string(),
            description: field(2).to_string(),
            raw_date_time: field(3).to_string(),
            transport_mode,
        };

        let remainder = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
        let remainder = remainder.trim();
        let display_text = if remainder.is_empty() {
            acknowledgement(&command.name)
        } else {
            remainder.to_string()
        };

        debug!(
            name = %command.name,
            mode = %command.transport_mode,
            raw_date_time = %command.raw_date_time,
            "Extracted spot command"
        );

        Extraction::Command {
            command,
            display_text,
        }
    }

    /// Whether `text` contains a well-formed command.
    pub fn contains_command(text: &str) -> bool {
        ADD_SPOT_PATTERN.is_match(text)
    }
}

/// Canned reply used when the assistant sent nothing but the command.
pub fn acknowledgement(name: &str) -> String {
    format!("Understood. I'm now instructing the app to add {name} to your itinerary.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(extraction: Extraction) -> (SpotCommand, String) {
        match extraction {
            Extraction::Command {
                command,
                display_text,
            } => (command, display_text),
            Extraction::PlainText(text) => panic!("expected a command, got plain text: {text}"),
        }
    }

    // ---- Well-formed commands ----

    #[test]
    fn test_extract_command_with_surrounding_prose() {
        let text = "Great choice! AI_ADD_SPOT::name=Tokyo SkyTree;;description=Tall tower with observation deck;;dateTime=2024-07-15T14:30;;transportMode=train I've asked the app to add it.";
        let (cmd, display) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.name, "Tokyo SkyTree");
        assert_eq!(cmd.description, "Tall tower with observation deck");
        assert_eq!(cmd.raw_date_time, "2024-07-15T14:30");
        assert_eq!(cmd.transport_mode, TransportMode::Train);
        assert_eq!(display, "Great choice!  I've asked the app to add it.");
    }

    #[test]
    fn test_extract_sentinel_and_trailing_separator() {
        let text = "AI_ADD_SPOT::name=Ramen Place;;description=;;dateTime=DATETIME_UNSPECIFIED;;transportMode=walk;;";
        let (cmd, display) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.name, "Ramen Place");
        assert_eq!(cmd.description, "");
        assert_eq!(cmd.raw_date_time, DATETIME_UNSPECIFIED);
        assert_eq!(cmd.transport_mode, TransportMode::Walk);
        assert_eq!(
            display,
            "Understood. I'm now instructing the app to add Ramen Place to your itinerary."
        );
    }

    #[test]
    fn test_extract_every_transport_mode() {
        for mode in TransportMode::ALL {
            let text = format!(
                "AI_ADD_SPOT::name=X;;description=d;;dateTime=2024-07-15T14:30;;transportMode={}",
                mode.as_str()
            );
            let (cmd, _) = command(CommandExtractor::extract(&text));
            assert_eq!(cmd.transport_mode, mode);
        }
    }

    #[test]
    fn test_description_may_span_lines() {
        let text = "Sure.\nAI_ADD_SPOT::name=Onsen;;description=Hot spring.\nBring a towel;;dateTime=2024-07-15T18:00;;transportMode=car\nEnjoy!";
        let (cmd, display) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.description, "Hot spring.\nBring a towel");
        assert_eq!(display, "Sure.\n\nEnjoy!");
    }

    #[test]
    fn test_single_semicolon_inside_value() {
        let text = "AI_ADD_SPOT::name=Cafe;;description=Coffee; cake;;dateTime=2024-07-15T10:00;;transportMode=walk";
        let (cmd, _) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.description, "Coffee; cake");
    }

    #[test]
    fn test_value_ending_in_semicolon() {
        let text = "AI_ADD_SPOT::name=Cafe;;description=Coffee; cake;;;dateTime=2024-07-15T10:00;;transportMode=walk";
        let (cmd, display) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.name, "Cafe");
        assert_eq!(cmd.description, "Coffee; cake;");
        assert_eq!(cmd.raw_date_time, "2024-07-15T10:00");
        assert_eq!(cmd.transport_mode, TransportMode::Walk);
        assert_eq!(display, acknowledgement("Cafe"));
    }

    #[test]
    fn test_only_first_command_is_used() {
        let text = "AI_ADD_SPOT::name=A;;description=;;dateTime=DATETIME_UNSPECIFIED;;transportMode=walk\nAI_ADD_SPOT::name=B;;description=;;dateTime=DATETIME_UNSPECIFIED;;transportMode=bus";
        let (cmd, display) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.name, "A");
        assert!(display.contains("name=B"));
    }

    #[test]
    fn test_raw_fields_are_not_trimmed() {
        let text = "AI_ADD_SPOT::name= Nara Park ;;description= deer ;;dateTime= 2024-07-15T09:00;;transportMode=train";
        let (cmd, _) = command(CommandExtractor::extract(text));
        assert_eq!(cmd.name, " Nara Park ");
        assert_eq!(cmd.description, " deer ");
        assert_eq!(cmd.raw_date_time, " 2024-07-15T09:00");
    }

    // ---- Malformed commands ----

    #[test]
    fn test_unknown_mode_is_plain_text() {
        let text = "AI_ADD_SPOT::name=X;;description=;;dateTime=DATETIME_UNSPECIFIED;;transportMode=teleport";
        assert_eq!(
            CommandExtractor::extract(text),
            Extraction::PlainText(text.to_string())
        );
    }

    #[test]
    fn test_mode_prefix_of_longer_word_is_plain_text() {
        let text = "AI_ADD_SPOT::name=X;;description=;;dateTime=DATETIME_UNSPECIFIED;;transportMode=carpool";
        assert!(!CommandExtractor::contains_command(text));
    }

    #[test]
    fn test_missing_field_is_plain_text() {
        let text = "AI_ADD_SPOT::name=X;;dateTime=2024-07-15T14:30;;transportMode=walk";
        assert!(matches!(
            CommandExtractor::extract(text),
            Extraction::PlainText(_)
        ));
    }

    #[test]
    fn test_wrong_field_order_is_plain_text() {
        let text = "AI_ADD_SPOT::description=d;;name=X;;dateTime=2024-07-15T14:30;;transportMode=walk";
        assert!(matches!(
            CommandExtractor::extract(text),
            Extraction::PlainText(_)
        ));
    }

    #[test]
    fn test_no_command() {
        let text = "Kyoto is lovely in autumn.";
        assert_eq!(
            CommandExtractor::extract(text),
            Extraction::PlainText(text.to_string())
        );
    }

    #[test]
    fn test_acknowledgement_with_empty_name() {
        assert_eq!(
            acknowledgement(""),
            "Understood. I'm now instructing the app to add  to your itinerary."
        );
    }
}
