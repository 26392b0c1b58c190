//! # Trip Financials
//!
//! Rolls a trip's loads and expenses into the totals stored on the trip.
//! Cancelled loads contribute neither revenue nor volume.

use serde::{Deserialize, Serialize};

use haul_core::{round_cents, sum_cents, Decimal, Timestamp};
use haul_state::{Load, LoadStatus, Trip, TripTotals};

use crate::expense::{ExpenseCategory, TripExpense};
use crate::pay::{driver_gross_pay, PayBreakdown, PayInputs};

/// Expense totals by bucket and by funding source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseBuckets {
    pub fuel: Decimal,
    pub tolls: Decimal,
    /// Manual driver pay entries.
    pub driver_pay: Decimal,
    /// Everything else: lumper, parking, maintenance, other.
    pub other: Decimal,
    pub company_funded: Decimal,
    pub driver_funded: Decimal,
}

pub fn bucket_expenses(expenses: &[TripExpense]) -> ExpenseBuckets {
    let total = |pick: &dyn Fn(&TripExpense) -> bool| {
        sum_cents(expenses.iter().filter(|e| pick(e)).map(|e| e.amount))
    };
    ExpenseBuckets {
        fuel: total(&|e| e.category == ExpenseCategory::Fuel),
        tolls: total(&|e| e.category == ExpenseCategory::Tolls),
        driver_pay: total(&|e| e.category == ExpenseCategory::DriverPay),
        other: total(&|e| {
            !matches!(
                e.category,
                ExpenseCategory::Fuel | ExpenseCategory::Tolls | ExpenseCategory::DriverPay
            )
        }),
        company_funded: total(&|e| !e.paid_by.is_driver_funded()),
        driver_funded: total(&|e| e.paid_by.is_driver_funded()),
    }
}

/// Every derived money figure for one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripFinancials {
    pub revenue: Decimal,
    pub total_cuft: Decimal,
    pub miles: Decimal,
    /// `None` when no driver compensation is on the trip.
    pub pay: Option<PayBreakdown>,
    pub computed_driver_pay: Decimal,
    pub manual_driver_pay: Decimal,
    pub total_driver_pay: Decimal,
    pub expenses: ExpenseBuckets,
    pub profit: Decimal,
}

impl TripFinancials {
    /// The subset stored on the trip record.
    pub fn totals(&self) -> TripTotals {
        TripTotals {
            revenue: self.revenue,
            driver_pay: self.total_driver_pay,
            fuel: self.expenses.fuel,
            tolls: self.expenses.tolls,
            other_expenses: self.expenses.other,
            profit: self.profit,
            total_cuft: self.total_cuft,
        }
    }
}

/// Compute financials without touching the trip.
///
/// `loads` are the trip's attached loads, `expenses` its expenses.
pub fn compute_trip_financials(
    trip: &Trip,
    loads: &[Load],
    expenses: &[TripExpense],
) -> TripFinancials {
    let counted = || loads.iter().filter(|l| l.status != LoadStatus::Cancelled);
    let revenue = sum_cents(counted().map(Load::total_rate));
    let total_cuft = counted()
        .map(Load::volume)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    let miles = trip.miles();

    let pay = trip.compensation.as_ref().map(|snapshot| {
        driver_gross_pay(
            snapshot,
            &PayInputs {
                miles,
                cubic_feet: total_cuft,
                revenue,
                start_date: trip.start_date,
                end_date: trip.end_date,
            },
        )
    });
    let computed_driver_pay = pay.as_ref().map(|p| p.gross).unwrap_or(Decimal::ZERO);
    let expenses = bucket_expenses(expenses);
    let manual_driver_pay = expenses.driver_pay;
    let total_driver_pay = round_cents(computed_driver_pay.saturating_add(manual_driver_pay));
    let costs = sum_cents([total_driver_pay, expenses.fuel, expenses.tolls, expenses.other]);
    let profit = round_cents(revenue.saturating_sub(costs));

    TripFinancials {
        revenue,
        total_cuft,
        miles,
        pay,
        computed_driver_pay,
        manual_driver_pay,
        total_driver_pay,
        expenses,
        profit,
    }
}

/// Compute financials and write the totals back onto `trip`.
pub fn recompute(trip: &mut Trip, loads: &[Load], expenses: &[TripExpense]) -> TripFinancials {
    let financials = compute_trip_financials(trip, loads, expenses);
    trip.totals = financials.totals();
    trip.timestamps.totals_computed_at = Some(Timestamp::now());
    financials
}
