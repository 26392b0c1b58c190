//! # Settlement Preview
//!
//! What the driver is owed at settlement:
//! `net = gross + reimbursements − collections`, where reimbursements are
//! driver-funded expenses and collections are cash and check amounts the
//! driver took on delivery.

use serde::{Deserialize, Serialize};

use haul_core::{round_cents, sum_cents, Decimal, LoadId, PayMode, TripId};
use haul_state::Load;

use crate::expense::TripExpense;
use crate::financials::TripFinancials;

/// One load's cash or check collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLine {
    pub load_id: LoadId,
    pub load_number: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPreview {
    pub trip_id: TripId,
    pub pay_mode: Option<PayMode>,
    /// Computed plus manual driver pay.
    pub gross_pay: Decimal,
    pub reimbursements: Decimal,
    pub collections: Decimal,
    pub collection_lines: Vec<CollectionLine>,
    pub net_pay: Decimal,
}

/// `gross + reimbursements − collections`, rounded to cents.
pub fn net_pay(gross: Decimal, reimbursements: Decimal, collections: Decimal) -> Decimal {
    round_cents(
        round_cents(gross)
            .saturating_add(round_cents(reimbursements))
            .saturating_sub(round_cents(collections)),
    )
}

/// Build the preview from already-computed financials.
pub fn settlement_preview(
    trip_id: TripId,
    financials: &TripFinancials,
    loads: &[Load],
    expenses: &[TripExpense],
) -> SettlementPreview {
    let reimbursements = sum_cents(
        expenses
            .iter()
            .filter(|e| e.paid_by.is_driver_funded())
            .map(|e| e.amount),
    );
    let collection_lines: Vec<CollectionLine> = loads
        .iter()
        .filter(|load| load.collection() > Decimal::ZERO)
        .map(|load| CollectionLine {
            load_id: load.id,
            load_number: load.load_number.clone(),
            amount: round_cents(load.collection()),
        })
        .collect();
    let collections = sum_cents(collection_lines.iter().map(|line| line.amount));
    let gross_pay = financials.total_driver_pay;

    SettlementPreview {
        trip_id,
        pay_mode: financials.pay.as_ref().map(|p| p.pay_mode),
        gross_pay,
        reimbursements,
        collections,
        collection_lines,
        net_pay: net_pay(gross_pay, reimbursements, collections),
    }
}
