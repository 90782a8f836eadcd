pub mod collab;
pub mod config;
pub mod error;
pub mod itinerary;
pub mod types;

pub use collab::{search_places, Geocoder, RouteLookup};
pub use config::WayfarerConfig;
pub use error::{Result, WayfarerError};
pub use itinerary::{Itinerary, ItinerarySnapshot};
pub use types::*;
