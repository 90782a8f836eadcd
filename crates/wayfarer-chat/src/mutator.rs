//! Applies extracted spot commands to the itinerary and confirms them in
//! the transcript.

use tracing::info;
use wayfarer_core::{Itinerary, NewSpot, Spot};

use crate::error::ChatError;
use crate::transcript::Transcript;
use crate::types::{Message, NormalizedDateTime, Sender, SpotCommand};

/// Adds assistant-requested spots and posts the confirmation message.
pub struct ItineraryMutator<'a> {
    itinerary: &'a Itinerary,
    transcript: &'a Transcript,
}

impl<'a> ItineraryMutator<'a> {
    pub fn new(itinerary: &'a Itinerary, transcript: &'a Transcript) -> Self {
        Self {
            itinerary,
            transcript,
        }
    }

    /// Append a spot built from `command` with the normalized date/time,
    /// then append the confirmation message.
    ///
    /// The spot is visible in the itinerary before the confirmation appears.
    pub fn add(
        &self,
        command: &SpotCommand,
        date_time: &NormalizedDateTime,
    ) -> Result<(Spot, Message), ChatError> {
        let spot = self.itinerary.add(NewSpot {
            name: command.name.clone(),
            description: command.description.trim().to_string(),
            date_time: date_time.canonical.clone(),
            transport_mode: command.transport_mode,
            coordinates: None,
        })?;

        info!(
            spot_id = %spot.id,
            name = %spot.name,
            date_time = %spot.date_time,
            adjusted = date_time.adjusted,
            "Assistant added spot to itinerary"
        );

        let confirmation = self
            .transcript
            .append(Sender::Assistant, confirmation_text(&spot.name, date_time));
        Ok((spot, confirmation))
    }
}

/// Confirmation line for a newly added spot.
pub fn confirmation_text(name: &str, date_time: &NormalizedDateTime) -> String {
    let mut text = format!("Done! \"{name}\" has been added to your itinerary.");
    if date_time.adjusted {
        let (date, time) = date_time
            .canonical
            .split_once('T')
            .unwrap_or((date_time.canonical.as_str(), ""));
        text.push_str(&format!(
            " (Date/time set to {date} at {time}. Please review and edit if needed.)"
        ));
    }
    text.push_str(" You can view or modify it in the Itinerary tab.");
    text
}
