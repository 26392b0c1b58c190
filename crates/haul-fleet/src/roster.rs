//! # Trip Roster
//!
//! The trip↔load join. Each load appears at most once; attaching a load to
//! a trip detaches it from whatever trip held it before. Sequence indices
//! within a trip are kept contiguous from zero, so a load's delivery order
//! is always `sequence_index + 1`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{LoadId, TripId};

/// What part a load plays on its trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadRole {
    #[default]
    Primary,
    Backhaul,
    Partial,
}

/// One trip↔load link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripLoad {
    pub trip_id: TripId,
    pub load_id: LoadId,
    pub sequence_index: u32,
    #[serde(default)]
    pub role: LoadRole,
}

impl TripLoad {
    /// 1-based delivery position.
    pub fn delivery_order(&self) -> u32 {
        self.sequence_index + 1
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("load {load_id} is not attached to trip {trip_id}")]
    NotAttached { trip_id: TripId, load_id: LoadId },

    /// A reorder did not name exactly the trip's current loads.
    #[error("reorder for trip {trip_id} must list each attached load exactly once")]
    OrderMismatch { trip_id: TripId },
}

/// Result of attaching a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    pub link: TripLoad,
    /// Trip the load was moved off, if any.
    pub previous_trip: Option<TripId>,
}

/// In-memory trip↔load join keyed by load.
#[derive(Debug, Clone, Default)]
pub struct TripRoster {
    by_load: HashMap<LoadId, TripLoad>,
}

impl TripRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored links. Later duplicates for a load win.
    pub fn from_links(links: impl IntoIterator<Item = TripLoad>) -> Self {
        let mut roster = Self::new();
        for link in links {
            roster.by_load.insert(link.load_id, link);
        }
        roster
    }

    /// Attach `load_id` to the end of `trip_id`'s sequence.
    ///
    /// Re-attaching to the same trip only updates the role.
    pub fn attach(&mut self, trip_id: TripId, load_id: LoadId, role: LoadRole) -> Attached {
        if let Some(existing) = self.by_load.get_mut(&load_id) {
            if existing.trip_id == trip_id {
                existing.role = role;
                return Attached {
                    link: existing.clone(),
                    previous_trip: None,
                };
            }
        }

        let previous_trip = self.by_load.remove(&load_id).map(|old| {
            self.renumber(old.trip_id);
            old.trip_id
        });
        let link = TripLoad {
            trip_id,
            load_id,
            sequence_index: self.count(trip_id),
            role,
        };
        self.by_load.insert(load_id, link.clone());
        Attached {
            link,
            previous_trip,
        }
    }

    /// Remove `load_id` from `trip_id`.
    pub fn detach(&mut self, trip_id: TripId, load_id: LoadId) -> Result<TripLoad, RosterError> {
        match self.by_load.get(&load_id) {
            Some(link) if link.trip_id == trip_id => {}
            _ => return Err(RosterError::NotAttached { trip_id, load_id }),
        }
        let removed = self
            .by_load
            .remove(&load_id)
            .ok_or(RosterError::NotAttached { trip_id, load_id })?;
        self.renumber(trip_id);
        Ok(removed)
    }

    /// Replace the trip's sequence with `order`, which must name every
    /// attached load exactly once.
    pub fn reorder(&mut self, trip_id: TripId, order: &[LoadId]) -> Result<Vec<TripLoad>, RosterError> {
        let current = self.loads_for_trip(trip_id);
        let mut proposed: Vec<LoadId> = order.to_vec();
        let mut attached: Vec<LoadId> = current.iter().map(|link| link.load_id).collect();
        proposed.sort();
        proposed.dedup();
        attached.sort();
        if proposed.len() != order.len() || proposed != attached {
            return Err(RosterError::OrderMismatch { trip_id });
        }

        for (index, load_id) in order.iter().enumerate() {
            if let Some(link) = self.by_load.get_mut(load_id) {
                link.sequence_index = index as u32;
            }
        }
        Ok(self.loads_for_trip(trip_id))
    }

    /// Links for a trip, in sequence order.
    pub fn loads_for_trip(&self, trip_id: TripId) -> Vec<TripLoad> {
        let mut links: Vec<TripLoad> = self
            .by_load
            .values()
            .filter(|link| link.trip_id == trip_id)
            .cloned()
            .collect();
        links.sort_by_key(|link| link.sequence_index);
        links
    }

    pub fn trip_for_load(&self, load_id: LoadId) -> Option<TripId> {
        self.by_load.get(&load_id).map(|link| link.trip_id)
    }

    pub fn link(&self, load_id: LoadId) -> Option<&TripLoad> {
        self.by_load.get(&load_id)
    }

    /// All links, in no particular order.
    pub fn links(&self) -> impl Iterator<Item = &TripLoad> {
        self.by_load.values()
    }

    fn count(&self, trip_id: TripId) -> u32 {
        self.by_load
            .values()
            .filter(|link| link.trip_id == trip_id)
            .count() as u32
    }

    /// Close gaps in a trip's sequence, keeping relative order.
    fn renumber(&mut self, trip_id: TripId) {
        for (index, link) in self.loads_for_trip(trip_id).into_iter().enumerate() {
            if let Some(stored) = self.by_load.get_mut(&link.load_id) {
                stored.sequence_index = index as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(links: &[TripLoad]) -> Vec<LoadId> {
        links.iter().map(|link| link.load_id).collect()
    }

    #[test]
    fn attach_appends_in_order() {
        let mut roster = TripRoster::new();
        let trip = TripId::new();
        let (a, b) = (LoadId::new(), LoadId::new());
        roster.attach(trip, a, LoadRole::Primary);
        let second = roster.attach(trip, b, LoadRole::Backhaul);
        assert_eq!(second.link.sequence_index, 1);
        assert_eq!(second.link.delivery_order(), 2);
        assert_eq!(ids(&roster.loads_for_trip(trip)), vec![a, b]);
    }

    #[test]
    fn attaching_elsewhere_moves_the_load() {
        let mut roster = TripRoster::new();
        let (first, second) = (TripId::new(), TripId::new());
        let (a, b) = (LoadId::new(), LoadId::new());
        roster.attach(first, a, LoadRole::Primary);
        roster.attach(first, b, LoadRole::Primary);

        let moved = roster.attach(second, a, LoadRole::Partial);
        assert_eq!(moved.previous_trip, Some(first));
        assert_eq!(roster.trip_for_load(a), Some(second));
        let remaining = roster.loads_for_trip(first);
        assert_eq!(ids(&remaining), vec![b]);
        assert_eq!(remaining[0].sequence_index, 0);
    }

    #[test]
    fn reattach_same_trip_updates_role_only() {
        let mut roster = TripRoster::new();
        let trip = TripId::new();
        let a = LoadId::new();
        roster.attach(trip, a, LoadRole::Primary);
        let again = roster.attach(trip, a, LoadRole::Backhaul);
        assert_eq!(again.previous_trip, None);
        assert_eq!(again.link.role, LoadRole::Backhaul);
        assert_eq!(roster.loads_for_trip(trip).len(), 1);
    }

    #[test]
    fn detach_closes_gap() {
        let mut roster = TripRoster::new();
        let trip = TripId::new();
        let (a, b, c) = (LoadId::new(), LoadId::new(), LoadId::new());
        for load in [a, b, c] {
            roster.attach(trip, load, LoadRole::Primary);
        }
        roster.detach(trip, b).unwrap();
        let links = roster.loads_for_trip(trip);
        assert_eq!(ids(&links), vec![a, c]);
        assert_eq!(links[1].sequence_index, 1);

        assert_eq!(
            roster.detach(trip, b).unwrap_err(),
            RosterError::NotAttached { trip_id: trip, load_id: b }
        );
    }

    #[test]
    fn detach_from_wrong_trip_fails() {
        let mut roster = TripRoster::new();
        let a = LoadId::new();
        roster.attach(TripId::new(), a, LoadRole::Primary);
        assert!(roster.detach(TripId::new(), a).is_err());
    }

    #[test]
    fn reorder_requires_exact_permutation() {
        let mut roster = TripRoster::new();
        let trip = TripId::new();
        let (a, b, c) = (LoadId::new(), LoadId::new(), LoadId::new());
        for load in [a, b, c] {
            roster.attach(trip, load, LoadRole::Primary);
        }
        assert!(roster.reorder(trip, &[a, b]).is_err());
        assert!(roster.reorder(trip, &[a, a, b]).is_err());
        assert!(roster.reorder(trip, &[a, b, LoadId::new()]).is_err());

        let links = roster.reorder(trip, &[c, a, b]).unwrap();
        assert_eq!(ids(&links), vec![c, a, b]);
        assert_eq!(links[0].delivery_order(), 1);
    }

    #[test]
    fn from_links_rebuilds() {
        let trip = TripId::new();
        let link = TripLoad {
            trip_id: trip,
            load_id: LoadId::new(),
            sequence_index: 0,
            role: LoadRole::Primary,
        };
        let roster = TripRoster::from_links(vec![link.clone()]);
        assert_eq!(roster.loads_for_trip(trip), vec![link]);
    }
}
