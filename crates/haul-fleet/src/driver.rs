//! Driver records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use haul_core::{CompensationSnapshot, DriverId, OwnerId, Timestamp, TrailerId, TruckId};

/// A driver on the owner's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub owner_id: OwnerId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Equipment the driver normally runs, adopted by trips that have none.
    #[serde(default)]
    pub default_truck_id: Option<TruckId>,
    #[serde(default)]
    pub default_trailer_id: Option<TrailerId>,
    /// Current pay terms. Trips keep their own snapshot.
    #[serde(default)]
    pub compensation: Option<CompensationSnapshot>,
    #[serde(default)]
    pub license_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub medical_card_expiry: Option<NaiveDate>,
}

impl Driver {
    pub fn new(owner_id: OwnerId, name: impl Into<String>) -> Self {
        Self {
            id: DriverId::new(),
            owner_id,
            name: name.into(),
            phone: None,
            default_truck_id: None,
            default_trailer_id: None,
            compensation: None,
            license_expiry: None,
            medical_card_expiry: None,
        }
    }

    /// The driver's current pay terms, stamped for capture onto a trip.
    pub fn snapshot_compensation(&self, at: Timestamp) -> Option<CompensationSnapshot> {
        self.compensation.as_ref().map(|terms| terms.captured(at))
    }

    /// Whether the driver has a default truck or trailer on file.
    pub fn has_default_equipment(&self) -> bool {
        self.default_truck_id.is_some() || self.default_trailer_id.is_some()
    }
}
