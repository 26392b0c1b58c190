//! # haul-cli: Offline Tools for the Haul Stack
//!
//! Subcommands work on files and arguments alone. No server or database
//! is involved.
//!
//! - **pay** (`pay.rs`): gross driver pay for one set of trip figures.
//! - **settle** (`settle.rs`): trip financials and the driver settlement
//!   preview from a JSON bundle of trip, loads, and expenses.
//! - **compliance** (`compliance.rs`): expiration report over a JSON fleet
//!   file.
//!
//! Every handler returns the process exit code: 0 for success, 2 when a
//! check ran and found a problem the caller asked to fail on.

pub mod compliance;
pub mod output;
pub mod pay;
pub mod settle;
