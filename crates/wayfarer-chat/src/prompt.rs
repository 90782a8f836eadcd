//! Prompt construction: the assistant's standing instructions and the
//! itinerary context prefixed to every outgoing user message.

use wayfarer_core::{parse_canonical, Spot, TransportMode};

/// Standing instructions for the assistant, scoped to `destination`.
///
/// Teaches the `AI_ADD_SPOT` command grammar, the transport mode list, and
/// the `DATETIME_UNSPECIFIED` rule.
pub fn system_instruction(destination: &str) -> String {
    let modes = TransportMode::value_list();
    format!(
        r#"You are a friendly, practical travel assistant for trips to {destination}. Keep answers short and useful, and help the user shape their trip plan.
A user message may begin with a summary of their current itinerary. When it does, take it into account. Format replies with Markdown where it helps (lists, emphasis).

When the user wants to add a place to their itinerary, or you think a place would suit them, walk them through these steps:
1. Ask for or confirm the details of the spot:
    a. Spot Name (required)
    b. Description (optional short note; use an empty value when there is none)
    c. Date and Time in exactly YYYY-MM-DDTHH:MM format. If the user is vague, gives no specific time, or you cannot convert their wording to this exact format with confidence, use the literal string "DATETIME_UNSPECIFIED". For example, "tomorrow for dinner" becomes "DATETIME_UNSPECIFIED".
    d. Transport Mode, one of: {modes}
    e. Do NOT ask for coordinates. The app takes care of location separately.
2. Repeat the details back to the user, for example: "Here is the new spot: Name: [Name], Description: [Description], Date/Time: [DateTime], Transport: [TransportMode]. Shall I add it to your itinerary?"
3. Only once the user agrees **in the chat**, your *next* reply must contain this command on its own line:
   `AI_ADD_SPOT::name=[The Name];;description=[The Description];;dateTime=[The Date/Time String, e.g., YYYY-MM-DDTHH:MM or DATETIME_UNSPECIFIED];;transportMode=[The Transport Mode]`
   Substitute the real values for the bracketed placeholders. Always include the description field, even when empty (description=;;).
   For example: `AI_ADD_SPOT::name=Tokyo SkyTree;;description=Tall tower with observation deck;;dateTime=2024-07-15T14:30;;transportMode=train`
   With an unspecified date: `AI_ADD_SPOT::name=Ramen Place;;description=Try shoyu ramen;;dateTime=DATETIME_UNSPECIFIED;;transportMode=walk`
4. The prose of the reply that carries the command should be neutral and say plainly that you are asking the app to add the spot, for example: "Understood. I'm now instructing the app to add [Spot Name] to your itinerary." The app posts its own confirmation once the spot is added.
If the user declines, never emit the AI_ADD_SPOT command.
Stay brief unless the user asks for more detail."#
    )
}

/// Prefix `user_text` with a summary of `itinerary`.
///
/// An empty itinerary sends the user text unchanged.
pub fn compose_message(user_text: &str, itinerary: &[Spot]) -> String {
    if itinerary.is_empty() {
        return user_text.to_string();
    }
    let lines = itinerary
        .iter()
        .map(context_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Context: User's current travel itinerary. Consider this when responding:\n{lines}\n\nUser's new message:\n{user_text}"
    )
}

/// One itinerary line, e.g.
/// `- Tokyo Skytree on Jul 15, 2024 at 02:30 PM via train. Notes: N/A`.
fn context_line(spot: &Spot) -> String {
    let (date, time) = match parse_canonical(&spot.date_time) {
        Some(dt) => (
            dt.format("%b %-d, %Y").to_string(),
            dt.format("%I:%M %p").to_string(),
        ),
        None => ("N/A".to_string(), "N/A".to_string()),
    };
    let notes = if spot.description.is_empty() {
        "N/A"
    } else {
        spot.description.as_str()
    };
    format!(
        "- {} on {date} at {time} via {}. Notes: {notes}",
        spot.name, spot.transport_mode
    )
}
