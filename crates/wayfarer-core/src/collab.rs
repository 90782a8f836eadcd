//! Boundaries to the map-side collaborators.
//!
//! Geocoding and routing live outside this workspace; these traits describe
//! what the itinerary needs from them.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::types::{Coordinates, Place, Polyline};

/// Free-text place search.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Search for places matching `text`.
    async fn search(&self, text: &str) -> Result<Vec<Place>>;
}

/// Route geometry through an ordered list of stops.
#[async_trait]
pub trait RouteLookup: Send + Sync {
    /// Returns `None` on failure or when no route exists.
    async fn route(&self, waypoints: &[Coordinates]) -> Option<Polyline>;
}

/// Run a place search, short-circuiting blank queries.
pub async fn search_places(geocoder: &dyn Geocoder, query: &str) -> Result<Vec<Place>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let places = geocoder.search(query).await?;
    debug!(query, results = places.len(), "Place search finished");
    Ok(places)
}
