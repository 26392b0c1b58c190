//! # Equipment & Driver Inheritance
//!
//! A trip owns its driver, truck, and trailer. Loads carry copies of those
//! fields so counterparties and drivers can read them without joining
//! through the trip; this module is the only writer of those copies.
//!
//! - [`apply_assignment`] validates and records a driver/equipment change on
//!   the trip: unknown records are rejected, the compatibility rule is
//!   applied, a newly assigned driver's default equipment is adopted when the
//!   trip has none, and the driver's pay terms are snapshotted.
//! - [`apply_to_load`] copies the trip's assignment onto one load, hiding the
//!   driver's name and phone unless the trip shares them.
//! - [`clear_from_load`] wipes a detached load's derived fields.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use haul_core::{DriverId, Timestamp, TrailerId, TruckId};
use haul_state::{Load, LoadAssignment, Trip};

use crate::driver::Driver;
use crate::equipment::{resolve_trailer, CompatibilityError, Trailer, Truck};

// ─── Directory seam ──────────────────────────────────────────────────

/// Read access to the fleet records an assignment refers to.
///
/// Implementations scope lookups to the caller's owner; a record belonging
/// to another owner is reported as absent.
pub trait FleetDirectory {
    fn driver(&self, id: DriverId) -> Option<Driver>;
    fn truck(&self, id: TruckId) -> Option<Truck>;
    fn trailer(&self, id: TrailerId) -> Option<Trailer>;
}

/// A plain in-memory directory, used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFleet {
    pub drivers: HashMap<DriverId, Driver>,
    pub trucks: HashMap<TruckId, Truck>,
    pub trailers: HashMap<TrailerId, Trailer>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(mut self, driver: Driver) -> Self {
        self.drivers.insert(driver.id, driver);
        self
    }

    pub fn with_truck(mut self, truck: Truck) -> Self {
        self.trucks.insert(truck.id, truck);
        self
    }

    pub fn with_trailer(mut self, trailer: Trailer) -> Self {
        self.trailers.insert(trailer.id, trailer);
        self
    }
}

impl FleetDirectory for InMemoryFleet {
    fn driver(&self, id: DriverId) -> Option<Driver> {
        self.drivers.get(&id).cloned()
    }

    fn truck(&self, id: TruckId) -> Option<Truck> {
        self.trucks.get(&id).cloned()
    }

    fn trailer(&self, id: TrailerId) -> Option<Trailer> {
        self.trailers.get(&id).cloned()
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    #[error("driver {0} not found")]
    UnknownDriver(DriverId),

    #[error("truck {0} not found")]
    UnknownTruck(TruckId),

    #[error("trailer {0} not found")]
    UnknownTrailer(TrailerId),

    #[error(transparent)]
    Compatibility(#[from] CompatibilityError),
}

// ─── Trip-side assignment ────────────────────────────────────────────

/// A requested change to a trip's driver and equipment.
///
/// Each field is a patch: absent leaves the current value, `null` clears it,
/// a value sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    #[serde(default, deserialize_with = "patch", skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Option<DriverId>>,
    #[serde(default, deserialize_with = "patch", skip_serializing_if = "Option::is_none")]
    pub truck_id: Option<Option<TruckId>>,
    #[serde(default, deserialize_with = "patch", skip_serializing_if = "Option::is_none")]
    pub trailer_id: Option<Option<TrailerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_driver_with_companies: Option<bool>,
}

impl AssignmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.driver_id.is_none()
            && self.truck_id.is_none()
            && self.trailer_id.is_none()
            && self.share_driver_with_companies.is_none()
    }
}

fn patch<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What an accepted assignment changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentOutcome {
    /// The trip's driver after the change, resolved.
    pub driver: Option<Driver>,
    /// A different driver is now assigned.
    pub driver_assigned: bool,
    /// The driver was removed.
    pub driver_cleared: bool,
    /// Truck or trailer differ from before.
    pub equipment_changed: bool,
    /// The driver's default pairing was adopted.
    pub adopted_default_equipment: bool,
    /// The driver-sharing flag flipped.
    pub share_changed: bool,
    /// Driver id before the change, for notifying a replaced driver.
    pub previous_driver_id: Option<DriverId>,
}

impl AssignmentOutcome {
    /// Whether attached loads need their derived fields rewritten.
    pub fn touches_loads(&self) -> bool {
        self.driver_assigned || self.driver_cleared || self.equipment_changed || self.share_changed
    }
}

/// Validate `update` and record it on `trip`.
///
/// The trip is left untouched when an error is returned.
pub fn apply_assignment(
    trip: &mut Trip,
    update: &AssignmentUpdate,
    directory: &impl FleetDirectory,
) -> Result<AssignmentOutcome, FleetError> {
    let previous_driver_id = trip.driver_id;
    let driver_id = update.driver_id.unwrap_or(trip.driver_id);
    let driver = driver_id
        .map(|id| directory.driver(id).ok_or(FleetError::UnknownDriver(id)))
        .transpose()?;
    let driver_assigned = driver_id.is_some() && driver_id != previous_driver_id;

    let mut truck_id = update.truck_id.unwrap_or(trip.truck_id);
    let mut trailer_id = update.trailer_id.unwrap_or(trip.trailer_id);
    let mut adopted_default_equipment = false;
    let no_equipment_supplied = update.truck_id.is_none() && update.trailer_id.is_none();
    let trip_has_no_equipment = trip.truck_id.is_none() && trip.trailer_id.is_none();
    if driver_assigned && no_equipment_supplied && trip_has_no_equipment {
        if let Some(driver) = driver.as_ref().filter(|d| d.has_default_equipment()) {
            truck_id = driver.default_truck_id;
            trailer_id = driver.default_trailer_id;
            adopted_default_equipment = true;
        }
    }

    let truck = truck_id
        .map(|id| directory.truck(id).ok_or(FleetError::UnknownTruck(id)))
        .transpose()?;
    if let Some(id) = trailer_id {
        directory.trailer(id).ok_or(FleetError::UnknownTrailer(id))?;
    }
    let trailer_id = resolve_trailer(truck.as_ref(), trailer_id)?;

    let equipment_changed = truck_id != trip.truck_id || trailer_id != trip.trailer_id;
    let driver_cleared = driver_id.is_none() && previous_driver_id.is_some();

    if driver_assigned {
        trip.compensation = driver
            .as_ref()
            .and_then(|d| d.snapshot_compensation(Timestamp::now()));
    } else if driver_cleared {
        trip.compensation = None;
    }
    trip.driver_id = driver_id;
    trip.truck_id = truck_id;
    trip.trailer_id = trailer_id;
    let share_changed = match update.share_driver_with_companies {
        Some(share) if share != trip.share_driver_with_companies => {
            trip.share_driver_with_companies = share;
            true
        }
        _ => false,
    };

    Ok(AssignmentOutcome {
        driver,
        driver_assigned,
        driver_cleared,
        equipment_changed,
        adopted_default_equipment,
        share_changed,
        previous_driver_id,
    })
}

// ─── Load-side propagation ───────────────────────────────────────────

/// The trip's assignment as it should appear on its loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSource {
    pub driver_id: Option<DriverId>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub truck_id: Option<TruckId>,
    pub trailer_id: Option<TrailerId>,
    pub share_driver: bool,
}

impl AssignmentSource {
    /// Build from a trip and its resolved driver record.
    pub fn for_trip(trip: &Trip, driver: Option<&Driver>) -> Self {
        let driver = driver.filter(|d| Some(d.id) == trip.driver_id);
        Self {
            driver_id: trip.driver_id,
            driver_name: driver.map(|d| d.name.clone()),
            driver_phone: driver.and_then(|d| d.phone.clone()),
            truck_id: trip.truck_id,
            trailer_id: trip.trailer_id,
            share_driver: trip.share_driver_with_companies,
        }
    }
}

/// Overwrite `load`'s derived driver and equipment fields.
pub fn apply_to_load(source: &AssignmentSource, load: &mut Load, delivery_order: Option<u32>) {
    let shared = source.share_driver && source.driver_id.is_some();
    load.assignment = LoadAssignment {
        driver_id: source.driver_id,
        driver_name: if shared { source.driver_name.clone() } else { None },
        driver_phone: if shared { source.driver_phone.clone() } else { None },
        truck_id: source.truck_id,
        trailer_id: source.trailer_id,
        delivery_order,
    };
}

/// Clear every derived field on a load leaving its trip.
pub fn clear_from_load(load: &mut Load) {
    load.assignment = LoadAssignment::default();
}
