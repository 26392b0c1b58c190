//! # Equipment and Compatibility
//!
//! A tractor pulls a trailer and cannot run a trip without one. Box trucks
//! and cargo vans carry their own box; a trailer supplied with one of them
//! is dropped rather than rejected.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{OwnerId, TrailerId, TruckId};

/// Kind of power unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Tractor,
    BoxTruck,
    CargoVan,
}

impl VehicleType {
    /// Whether a trip using this unit must also carry a trailer.
    pub fn requires_trailer(&self) -> bool {
        matches!(self, Self::Tractor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tractor => "tractor",
            Self::BoxTruck => "box_truck",
            Self::CargoVan => "cargo_van",
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A power unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub owner_id: OwnerId,
    pub unit_number: String,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub inspection_expiry: Option<NaiveDate>,
}

impl Truck {
    pub fn new(owner_id: OwnerId, unit_number: impl Into<String>, vehicle_type: VehicleType) -> Self {
        Self {
            id: TruckId::new(),
            owner_id,
            unit_number: unit_number.into(),
            vehicle_type,
            registration_expiry: None,
            inspection_expiry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub id: TrailerId,
    pub owner_id: OwnerId,
    pub unit_number: String,
    #[serde(default)]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub inspection_expiry: Option<NaiveDate>,
}

impl Trailer {
    pub fn new(owner_id: OwnerId, unit_number: impl Into<String>) -> Self {
        Self {
            id: TrailerId::new(),
            owner_id,
            unit_number: unit_number.into(),
            registration_expiry: None,
            inspection_expiry: None,
        }
    }
}

/// Equipment pairing rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityError {
    /// A tractor was assigned with no trailer.
    #[error("truck {unit_number} is a tractor and requires a trailer")]
    TractorWithoutTrailer {
        truck_id: TruckId,
        unit_number: String,
    },
}

/// Apply the compatibility rule to a proposed truck/trailer pair.
///
/// Returns the trailer to record: unchanged for a tractor, `None` for any
/// other vehicle type.
pub fn resolve_trailer(
    truck: Option<&Truck>,
    trailer: Option<TrailerId>,
) -> Result<Option<TrailerId>, CompatibilityError> {
    match truck {
        None => Ok(trailer),
        Some(truck) if truck.vehicle_type.requires_trailer() => match trailer {
            Some(trailer) => Ok(Some(trailer)),
            None => Err(CompatibilityError::TractorWithoutTrailer {
                truck_id: truck.id,
                unit_number: truck.unit_number.clone(),
            }),
        },
        Some(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tractor_without_trailer_fails() {
        let tractor = Truck::new(OwnerId::new(), "T-12", VehicleType::Tractor);
        let err = resolve_trailer(Some(&tractor), None).unwrap_err();
        assert!(err.to_string().contains("T-12"));
    }

    #[test]
    fn tractor_keeps_its_trailer() {
        let tractor = Truck::new(OwnerId::new(), "T-12", VehicleType::Tractor);
        let trailer = TrailerId::new();
        assert_eq!(resolve_trailer(Some(&tractor), Some(trailer)).unwrap(), Some(trailer));
    }

    #[test]
    fn box_truck_drops_supplied_trailer() {
        let box_truck = Truck::new(OwnerId::new(), "B-3", VehicleType::BoxTruck);
        assert_eq!(resolve_trailer(Some(&box_truck), Some(TrailerId::new())).unwrap(), None);
        let van = Truck::new(OwnerId::new(), "V-1", VehicleType::CargoVan);
        assert_eq!(resolve_trailer(Some(&van), None).unwrap(), None);
    }

    #[test]
    fn no_truck_leaves_trailer_alone() {
        let trailer = TrailerId::new();
        assert_eq!(resolve_trailer(None, Some(trailer)).unwrap(), Some(trailer));
    }

    #[test]
    fn vehicle_type_wire_names() {
        assert_eq!(serde_json::to_string(&VehicleType::BoxTruck).unwrap(), "\"box_truck\"");
        assert_eq!(VehicleType::CargoVan.to_string(), "cargo_van");
    }
}
