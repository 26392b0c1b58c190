//! # haul-core: Foundational Types for the Haul Stack
//!
//! Every other crate in the workspace depends on `haul-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `LoadId`, `TripId`, `DriverId`,
//!    `TruckId`, `TrailerId`, `OwnerId`, `CompanyId` are distinct types. A
//!    truck id cannot be passed where a trailer id is expected.
//!
//! 2. **Decimal money.** Amounts are `rust_decimal::Decimal`, never `f64`.
//!    All rounding flows through [`money::round_cents`], which rounds half
//!    away from zero to two places.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! 4. **Snapshotted compensation.** [`CompensationSnapshot`] is copied onto a
//!    trip at assignment time and never re-read from the live driver.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `haul-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod compensation;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use compensation::{CompensationSnapshot, PayMode};
pub use error::{require_text, HaulError, ValidationError};
pub use identity::{CompanyId, DriverId, ExpenseId, LoadId, OwnerId, TrailerId, TripId, TruckId};
pub use money::{check_limit, percent_of, round_cents, sum_cents, times_rate, MAX_AMOUNT};
pub use temporal::{days_until, inclusive_days, Timestamp};

/// Re-exported so downstream crates name one decimal type.
pub use rust_decimal::Decimal;
