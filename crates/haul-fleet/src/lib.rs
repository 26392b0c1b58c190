//! # haul-fleet: Fleet Records, Roster, and Inheritance
//!
//! - **Equipment** (`equipment.rs`): trucks, trailers, and the tractor/trailer
//!   compatibility rule.
//! - **Drivers** (`driver.rs`): driver records with default equipment pairing,
//!   pay terms, and credential expiries.
//! - **Roster** (`roster.rs`): the trip↔load join. A load belongs to at most
//!   one trip; attaching it elsewhere moves it.
//! - **Inheritance** (`inheritance.rs`): applies a trip's driver and
//!   equipment to the trip itself and to every attached load.
//!
//! Load driver and equipment fields are derived data. Nothing outside
//! `inheritance.rs` writes them.

pub mod driver;
pub mod equipment;
pub mod inheritance;
pub mod roster;

pub use driver::Driver;
pub use equipment::{resolve_trailer, CompatibilityError, Trailer, Truck, VehicleType};
pub use inheritance::{
    apply_assignment, apply_to_load, clear_from_load, AssignmentOutcome, AssignmentSource,
    AssignmentUpdate, FleetDirectory, FleetError, InMemoryFleet,
};
pub use roster::{Attached, LoadRole, RosterError, TripLoad, TripRoster};
