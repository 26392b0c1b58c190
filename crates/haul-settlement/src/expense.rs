//! # Trip Expenses
//!
//! Every expense needs a receipt. Who paid decides whether the driver is
//! reimbursed: anything on the driver's own money is owed back at
//! settlement, anything on a company instrument is not.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{
    check_limit, require_text, round_cents, Decimal, ExpenseId, OwnerId, Timestamp, TripId,
    ValidationError,
};
use haul_state::{Trip, TripStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Fuel,
    Tolls,
    /// Manual driver pay entry, added on top of computed pay.
    DriverPay,
    Lumper,
    Parking,
    Maintenance,
    Other,
}

/// Who paid for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidBy {
    DriverPersonal,
    CompanyCard,
    FuelCard,
    CompanyAccount,
}

impl PaidBy {
    /// Whether the driver fronted the money.
    pub fn is_driver_funded(&self) -> bool {
        matches!(self, Self::DriverPersonal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripExpense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub owner_id: OwnerId,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub paid_by: PaidBy,
    pub receipt_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub incurred_on: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// An expense as submitted, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewExpense {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Decimal>,
    pub paid_by: Option<PaidBy>,
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub incurred_on: Option<NaiveDate>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpenseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Settled and cancelled trips take no further expenses.
    #[error("trip {trip_id} is {status} and no longer accepts expense changes")]
    TripClosed { trip_id: TripId, status: TripStatus },
}

impl TripExpense {
    /// Validate `new` and record it against `trip`.
    pub fn record(trip: &Trip, new: NewExpense) -> Result<Self, ExpenseError> {
        ensure_open(trip)?;
        let category = new.category.ok_or(ValidationError::missing("category"))?;
        let amount = new.amount.ok_or(ValidationError::missing("amount"))?;
        if amount <= Decimal::ZERO {
            return Err(ValidationError::invalid("amount", "must be positive").into());
        }
        check_limit("amount", amount)?;
        let paid_by = new.paid_by.ok_or(ValidationError::missing("paid_by"))?;
        let receipt = require_text(new.receipt_url.as_deref(), "receipt_url")?.to_string();

        Ok(Self {
            id: ExpenseId::new(),
            trip_id: trip.id,
            owner_id: trip.owner_id,
            category,
            amount: round_cents(amount),
            paid_by,
            receipt_url: receipt,
            description: new.description,
            incurred_on: new.incurred_on,
            created_at: Some(Timestamp::now()),
        })
    }
}

/// Reject expense changes on a trip that has been settled or cancelled.
pub fn ensure_open(trip: &Trip) -> Result<(), ExpenseError> {
    if trip.status.is_terminal() {
        return Err(ExpenseError::TripClosed {
            trip_id: trip.id,
            status: trip.status,
        });
    }
    Ok(())
}
