//! # haul-state: Load and Trip Lifecycle State Machines
//!
//! - **Load** (`load.rs`): `pending → accepted → loading → loaded →
//!   in_transit → delivered`, with `storage_completed` as the alternate
//!   terminal and `cancelled` reachable from pending and accepted.
//!
//! - **Trip** (`trip.rs`): `planned → active → en_route → completed →
//!   settled`, with `cancelled` reachable before completion. Closing
//!   transitions are gated on odometer evidence and on every attached load
//!   being finished.
//!
//! Statuses are closed enums with validated transitions. A rejected
//! transition leaves the record untouched; an accepted one appends a
//! [`TransitionRecord`] to the record's log.

pub mod load;
pub mod transition;
pub mod trip;

pub use load::{
    AccessorialCharge, CancelEvidence, DeliveryEvidence, FinishLoadingEvidence, Load,
    LoadAssignment, LoadError, LoadPhotos, LoadPricing, LoadStatus, LoadTimestamps, LoadView,
    PaymentMethod, PickupEvidence, StartLoadingEvidence, StorageDrop, StorageDropEvidence,
};
pub use transition::TransitionRecord;
pub use trip::{
    CloseEvidence, OdometerReadings, OdometerStartEvidence, PendingLoad, Trip, TripError,
    TripStatus, TripTimestamps, TripTotals,
};
