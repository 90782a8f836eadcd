use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical local timestamp format used for every stored spot.
pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

// =============================================================================
// Enums
// =============================================================================

/// How the traveller gets to a spot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walk,
    Bicycle,
    Car,
    Bus,
    Train,
    Plane,
    Boat,
    Other,
}

impl TransportMode {
    /// Every mode, in the order presented to users and to the assistant.
    pub const ALL: [TransportMode; 8] = [
        TransportMode::Walk,
        TransportMode::Bicycle,
        TransportMode::Car,
        TransportMode::Bus,
        TransportMode::Train,
        TransportMode::Plane,
        TransportMode::Boat,
        TransportMode::Other,
    ];

    /// Wire value, as used in the command token and in serialized spots.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Bicycle => "bicycle",
            TransportMode::Car => "car",
            TransportMode::Bus => "bus",
            TransportMode::Train => "train",
            TransportMode::Plane => "plane",
            TransportMode::Boat => "boat",
            TransportMode::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Walk => "Walk",
            TransportMode::Bicycle => "Bicycle",
            TransportMode::Car => "Car",
            TransportMode::Bus => "Bus",
            TransportMode::Train => "Train",
            TransportMode::Plane => "Plane",
            TransportMode::Boat => "Boat",
            TransportMode::Other => "Other",
        }
    }

    /// Comma-separated wire values, e.g. `"walk, bicycle, car, ..."`.
    pub fn value_list() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown transport mode: {}", s))
    }
}

// =============================================================================
// Value objects
// =============================================================================

/// A `[longitude, latitude]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.longitude, c.latitude]
    }
}

/// Format a naive local timestamp in canonical `YYYY-MM-DDTHH:MM` form.
pub fn format_canonical(dt: &NaiveDateTime) -> String {
    dt.format(CANONICAL_DATETIME_FORMAT).to_string()
}

/// Parse a canonical `YYYY-MM-DDTHH:MM` string.
///
/// Returns `None` for anything that would not round-trip exactly, so a
/// `Some` result always re-formats to the same string.
pub fn parse_canonical(s: &str) -> Option<NaiveDateTime> {
    let dt = NaiveDateTime::parse_from_str(s, CANONICAL_DATETIME_FORMAT).ok()?;
    (has_canonical_year(&dt) && format_canonical(&dt) == s).then_some(dt)
}

/// Whether the year fits the four-digit `YYYY` field. `%Y` alone also
/// formats signed and five-digit years.
pub fn has_canonical_year(dt: &NaiveDateTime) -> bool {
    (0..=9999).contains(&dt.year())
}

// =============================================================================
// Itinerary entries
// =============================================================================

/// A single itinerary entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: Uuid,
    pub name: String,
    /// Free-form note, may be empty.
    pub description: String,
    /// Always canonical `YYYY-MM-DDTHH:MM` local time.
    pub date_time: String,
    pub transport_mode: TransportMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// A spot that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpot {
    pub name: String,
    pub description: String,
    pub date_time: String,
    pub transport_mode: TransportMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl NewSpot {
    /// Assign a fresh id.
    pub fn into_spot(self) -> Spot {
        Spot {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            date_time: self.date_time,
            transport_mode: self.transport_mode,
            coordinates: self.coordinates,
        }
    }
}

// =============================================================================
// Collaborator payloads
// =============================================================================

/// A geocoding hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub display_name: String,
    pub coordinates: Coordinates,
}

/// Route geometry between itinerary stops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub coordinates: Vec<Coordinates>,
}
