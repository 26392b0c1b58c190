//! Dispatch-level error type. Every lower-crate error folds into
//! [`DispatchError`]; the HTTP layer maps its variants to status codes.

use thiserror::Error;

use haul_compliance::ComplianceBlocked;
use haul_core::ValidationError;
use haul_fleet::{CompatibilityError, FleetError, RosterError};
use haul_settlement::ExpenseError;
use haul_state::{LoadError, TripError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The record does not exist or belongs to another owner; both read the
    /// same.
    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Trip(#[from] TripError),

    #[error(transparent)]
    Compatibility(#[from] CompatibilityError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Expense(#[from] ExpenseError),

    #[error(transparent)]
    Compliance(#[from] ComplianceBlocked),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DispatchError {
    pub fn not_found(kind: &'static str) -> Self {
        Self::NotFound { kind }
    }
}

impl From<FleetError> for DispatchError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::UnknownDriver(_) => Self::not_found("driver"),
            FleetError::UnknownTruck(_) => Self::not_found("truck"),
            FleetError::UnknownTrailer(_) => Self::not_found("trailer"),
            FleetError::Compatibility(err) => Self::Compatibility(err),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
