//! # Settle Subcommand
//!
//! Reads a bundle holding one trip, its loads, and its expenses, then
//! prints the trip financials and the driver settlement preview. The trip
//! record in the bundle is not modified.
//!
//! ```json
//! { "trip": { ... }, "loads": [ ... ], "expenses": [ ... ] }
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use haul_settlement::{
    compute_trip_financials, settlement_preview, SettlementPreview, TripExpense, TripFinancials,
};
use haul_state::{Load, Trip};

use crate::output::{read_json, to_pretty};

/// Arguments for `haul settle`.
#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Path to the JSON bundle.
    #[arg(long, short)]
    pub file: PathBuf,

    /// Exit with code 2 when the driver owes money back.
    #[arg(long)]
    pub fail_on_negative: bool,
}

#[derive(Debug, Deserialize)]
pub struct SettlementBundle {
    pub trip: Trip,
    #[serde(default)]
    pub loads: Vec<Load>,
    #[serde(default)]
    pub expenses: Vec<TripExpense>,
}

#[derive(Debug, Serialize)]
pub struct SettlementReport {
    pub financials: TripFinancials,
    pub preview: SettlementPreview,
}

/// Financials and preview for a bundle. Expenses filed against another
/// trip are skipped.
pub fn settle(bundle: &SettlementBundle) -> SettlementReport {
    let trip = &bundle.trip;
    let expenses: Vec<TripExpense> = bundle
        .expenses
        .iter()
        .filter(|e| {
            let ours = e.trip_id == trip.id;
            if !ours {
                tracing::warn!(expense = %e.id, trip = %e.trip_id, "skipping expense filed against another trip");
            }
            ours
        })
        .cloned()
        .collect();

    let financials = compute_trip_financials(trip, &bundle.loads, &expenses);
    let preview = settlement_preview(trip.id, &financials, &bundle.loads, &expenses);
    SettlementReport {
        financials,
        preview,
    }
}

/// Execute `haul settle`.
pub fn run_settle(args: &SettleArgs) -> Result<u8> {
    let bundle: SettlementBundle = read_json(&args.file)?;
    tracing::info!(
        trip = %bundle.trip.trip_number,
        loads = bundle.loads.len(),
        expenses = bundle.expenses.len(),
        "settling trip bundle"
    );

    let report = settle(&bundle);
    println!("{}", to_pretty(&report)?);

    if args.fail_on_negative && report.preview.net_pay.is_sign_negative() {
        tracing::warn!(net_pay = %report.preview.net_pay, "driver owes a balance");
        return Ok(2);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::{CompensationSnapshot, OwnerId, PayMode};
    use haul_settlement::{ExpenseCategory, NewExpense, PaidBy};
    use haul_state::{LoadStatus, PaymentMethod};
    use rust_decimal::Decimal;
    use std::io::Write;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn trip() -> Trip {
        let mut trip = Trip::new(OwnerId::new(), "T-100");
        let mut snap = CompensationSnapshot::new(PayMode::PerMile);
        snap.rate_per_mile = Some(dec("0.50"));
        trip.compensation = Some(snap);
        trip.odometer.start = Some(dec("10000"));
        trip.odometer.end = Some(dec("10400"));
        trip
    }

    fn expense(trip: &Trip, category: ExpenseCategory, amount: &str, paid_by: PaidBy) -> TripExpense {
        TripExpense::record(
            trip,
            NewExpense {
                category: Some(category),
                amount: Some(dec(amount)),
                paid_by: Some(paid_by),
                receipt_url: Some("receipt.jpg".into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn bundle() -> SettlementBundle {
        let trip = trip();
        let mut load = Load::new(trip.owner_id, "L-1");
        load.pricing.contract_rate = dec("1800");
        load.actual_cuft_loaded = Some(dec("600"));
        load.status = LoadStatus::Delivered;
        load.collected_amount = Some(dec("150"));
        load.payment_method = Some(PaymentMethod::Cash);

        let expenses = vec![
            expense(&trip, ExpenseCategory::Fuel, "250", PaidBy::CompanyCard),
            expense(&trip, ExpenseCategory::Tolls, "30", PaidBy::DriverPersonal),
        ];
        SettlementBundle {
            trip,
            loads: vec![load],
            expenses,
        }
    }

    #[test]
    fn settles_bundle() {
        let report = settle(&bundle());
        assert_eq!(report.financials.miles, dec("400"));
        assert_eq!(report.financials.revenue, dec("1800"));
        assert_eq!(report.financials.total_driver_pay, dec("200"));
        assert_eq!(report.financials.profit, dec("1320"));
        assert_eq!(report.preview.gross_pay, dec("200"));
        assert_eq!(report.preview.reimbursements, dec("30"));
        assert_eq!(report.preview.collections, dec("150"));
        assert_eq!(report.preview.net_pay, dec("80"));
    }

    #[test]
    fn skips_expenses_from_other_trips() {
        let mut b = bundle();
        let other = Trip::new(b.trip.owner_id, "T-200");
        b.expenses
            .push(expense(&other, ExpenseCategory::Fuel, "999", PaidBy::CompanyCard));
        let report = settle(&b);
        assert_eq!(report.financials.expenses.fuel, dec("250"));
    }

    #[test]
    fn reads_bundle_from_file() {
        let b = bundle();
        let json = serde_json::json!({
            "trip": b.trip,
            "loads": b.loads,
            "expenses": b.expenses,
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();

        let args = SettleArgs {
            file: file.path().to_path_buf(),
            fail_on_negative: true,
        };
        assert_eq!(run_settle(&args).unwrap(), 0);
    }

    #[test]
    fn negative_net_exits_two_when_asked() {
        let mut b = bundle();
        b.loads[0].collected_amount = Some(dec("500"));
        let json = serde_json::json!({ "trip": b.trip, "loads": b.loads, "expenses": b.expenses });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();

        let strict = SettleArgs {
            file: file.path().to_path_buf(),
            fail_on_negative: true,
        };
        assert_eq!(run_settle(&strict).unwrap(), 2);

        let lenient = SettleArgs {
            file: file.path().to_path_buf(),
            fail_on_negative: false,
        };
        assert_eq!(run_settle(&lenient).unwrap(), 0);
    }
}
