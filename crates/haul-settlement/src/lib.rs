//! # haul-settlement: Financial / Settlement Engine
//!
//! Derives every money figure on a trip from its loads, its expenses, and
//! the driver compensation snapshot captured at assignment:
//!
//! - **Expenses** (`expense.rs`): categorized trip expenses with mandatory
//!   receipts, split by who paid.
//! - **Pay** (`pay.rs`): driver gross pay under the five pay modes.
//! - **Financials** (`financials.rs`): revenue, volume, expense buckets,
//!   total driver pay, and profit, written back onto the trip.
//! - **Preview** (`preview.rs`): reimbursements, collections, and net pay.
//!
//! Every computed sub-amount is rounded to cents before it is combined.
//! Recomputation is a pure function of its inputs and can be re-run at any
//! time.

pub mod expense;
pub mod financials;
pub mod pay;
pub mod preview;

pub use expense::{ensure_open, ExpenseCategory, ExpenseError, NewExpense, PaidBy, TripExpense};
pub use financials::{
    bucket_expenses, compute_trip_financials, recompute, ExpenseBuckets, TripFinancials,
};
pub use pay::{driver_gross_pay, PayBreakdown, PayInputs};
pub use preview::{net_pay, settlement_preview, CollectionLine, SettlementPreview};
