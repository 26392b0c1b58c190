//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in [`crate::app`].

pub mod compliance;
pub mod fleet;
pub mod loads;
pub mod trips;
