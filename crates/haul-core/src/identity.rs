//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the lifecycle engine handles.
//! These prevent accidental identifier confusion: a `TruckId` cannot be
//! passed where a `TrailerId` is expected, and a load can never be looked up
//! with a trip identifier.
//!
//! All identifiers are UUID-backed, `Copy`, and serialize transparently as
//! the bare UUID string so that wire payloads stay flat.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// A single shipment.
    LoadId,
    "load"
);

uuid_id!(
    /// A driver/equipment assignment spanning an ordered set of loads.
    TripId,
    "trip"
);

uuid_id!(
    /// A driver on the owning account's roster.
    DriverId,
    "driver"
);

uuid_id!(
    /// A power unit (tractor, box truck, or van).
    TruckId,
    "truck"
);

uuid_id!(
    /// A trailer pulled by a tractor.
    TrailerId,
    "trailer"
);

uuid_id!(
    /// The account that owns loads, trips, and fleet records.
    ///
    /// Every dispatch operation is scoped to one owner; records belonging to
    /// another owner are reported as not found.
    OwnerId,
    "owner"
);

uuid_id!(
    /// A counterparty company a load is assigned to or shared with.
    CompanyId,
    "company"
);

uuid_id!(
    /// An expense recorded against a trip.
    ExpenseId,
    "expense"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_namespace_prefix() {
        let id = LoadId::from_uuid(Uuid::nil());
        assert_eq!(id.to_string(), "load:00000000-0000-0000-0000-000000000000");
        let trip = TripId::from_uuid(Uuid::nil());
        assert!(trip.to_string().starts_with("trip:"));
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let raw = Uuid::new_v4();
        let id = TruckId::from_uuid(raw);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{raw}\""));
        let back: TruckId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(DriverId::new(), DriverId::new());
    }
}
