//! Session-scoped itinerary store.
//!
//! Holds the ordered spot collection behind a copy-on-write snapshot:
//! every mutation swaps in a new `Arc<Vec<Spot>>`, so a reader holding a
//! snapshot never observes a half-applied change.

use std::sync::{Arc, RwLock};

use chrono::{Duration, NaiveDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::collab::RouteLookup;
use crate::error::{Result, WayfarerError};
use crate::types::{
    format_canonical, parse_canonical, Coordinates, NewSpot, Polyline, Spot, TransportMode,
};

/// Immutable view of the itinerary at one point in time.
pub type ItinerarySnapshot = Arc<Vec<Spot>>;

/// Ordered, editable collection of spots.
#[derive(Debug, Default)]
pub struct Itinerary {
    spots: RwLock<ItinerarySnapshot>,
}

impl Itinerary {
    /// Create an empty itinerary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an itinerary pre-populated with a few well-known Japan spots,
    /// scheduled relative to `now`.
    pub fn seeded(now: NaiveDateTime) -> Self {
        let demo = [
            (
                "Tokyo Skytree",
                "Iconic communications and observation tower.",
                Duration::days(1),
                TransportMode::Train,
                Coordinates::new(139.8107, 35.7101),
            ),
            (
                "Kinkaku-ji",
                "Zen Buddhist temple in Kyoto, covered in gold leaf.",
                Duration::days(2),
                TransportMode::Bus,
                Coordinates::new(135.7292, 35.0394),
            ),
            (
                "Fushimi Inari Shrine",
                "Famous for its thousands of vibrant red torii gates.",
                Duration::days(3),
                TransportMode::Walk,
                Coordinates::new(135.7727, 34.9671),
            ),
            (
                "Tokyo Station",
                "Central railway station.",
                Duration::hours(12),
                TransportMode::Train,
                Coordinates::new(139.7671, 35.6812),
            ),
        ];

        let spots = demo
            .into_iter()
            .map(|(name, description, offset, mode, coords)| {
                NewSpot {
                    name: name.to_string(),
                    description: description.to_string(),
                    date_time: format_canonical(&(now + offset)),
                    transport_mode: mode,
                    coordinates: Some(coords),
                }
                .into_spot()
            })
            .collect();

        Self {
            spots: RwLock::new(Arc::new(spots)),
        }
    }

    /// Current snapshot. Cheap: clones the `Arc`, not the spots.
    pub fn snapshot(&self) -> ItinerarySnapshot {
        Arc::clone(&*self.read())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Look up a spot by id.
    pub fn get(&self, id: Uuid) -> Option<Spot> {
        self.read().iter().find(|s| s.id == id).cloned()
    }

    /// Append a new spot to the end of the itinerary.
    ///
    /// The date/time must already be canonical.
    pub fn add(&self, new_spot: NewSpot) -> Result<Spot> {
        ensure_canonical(&new_spot.date_time)?;
        let spot = new_spot.into_spot();
        self.write(|spots| spots.push(spot.clone()));
        debug!(spot_id = %spot.id, name = %spot.name, "Spot added to itinerary");
        Ok(spot)
    }

    /// Replace the spot with the same id, keeping its position.
    pub fn update(&self, spot: Spot) -> Result<Spot> {
        ensure_canonical(&spot.date_time)?;
        let mut found = false;
        self.write(|spots| {
            if let Some(slot) = spots.iter_mut().find(|s| s.id == spot.id) {
                *slot = spot.clone();
                found = true;
            }
        });
        if found {
            debug!(spot_id = %spot.id, "Spot updated");
            Ok(spot)
        } else {
            Err(WayfarerError::SpotNotFound(spot.id))
        }
    }

    /// Remove a spot by id, returning it.
    pub fn remove(&self, id: Uuid) -> Result<Spot> {
        let mut removed = None;
        self.write(|spots| {
            if let Some(pos) = spots.iter().position(|s| s.id == id) {
                removed = Some(spots.remove(pos));
            }
        });
        removed.ok_or(WayfarerError::SpotNotFound(id))
    }

    /// Move the spot at `from` so it ends up at index `to`.
    pub fn reorder(&self, from: usize, to: usize) -> Result<()> {
        let len = self.len();
        for index in [from, to] {
            if index >= len {
                return Err(WayfarerError::InvalidIndex { index, len });
            }
        }
        if from != to {
            self.write(|spots| {
                let moved = spots.remove(from);
                spots.insert(to, moved);
            });
        }
        Ok(())
    }

    /// Coordinates of every spot that has them, in itinerary order.
    pub fn waypoints(&self) -> Vec<Coordinates> {
        self.read().iter().filter_map(|s| s.coordinates).collect()
    }

    /// Ask the route collaborator for a polyline through all plottable spots.
    ///
    /// Returns `None` without calling the lookup when fewer than two spots
    /// have coordinates.
    pub async fn route_via(&self, lookup: &dyn RouteLookup) -> Option<Polyline> {
        let waypoints = self.waypoints();
        if waypoints.len() < 2 {
            return None;
        }
        lookup.route(&waypoints).await
    }

    // -- Private helpers --

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ItinerarySnapshot> {
        self.spots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, mutate: impl FnOnce(&mut Vec<Spot>)) {
        let mut guard = self.spots.write().unwrap_or_else(|e| e.into_inner());
        let mut next: Vec<Spot> = (**guard).clone();
        mutate(&mut next);
        *guard = Arc::new(next);
    }
}

fn ensure_canonical(date_time: &str) -> Result<()> {
    parse_canonical(date_time)
        .map(|_| ())
        .ok_or_else(|| WayfarerError::InvalidDateTime(date_time.to_string()))
}
