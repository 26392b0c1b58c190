//! # Money and Roster Invariants
//!
//! Property tests over randomly generated trips. Every figure the
//! dispatcher stores on a trip must satisfy the profit identity and be
//! cent-precise, the settlement preview must satisfy the net-pay identity,
//! and the roster must stay contiguous however loads come and go.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use haul_compliance::{ComplianceGate, GateMode};
use haul_core::{round_cents, CompensationSnapshot, LoadId, OwnerId, PayMode, TripId};
use haul_dispatch::{Dispatcher, Effects, Ledger, MemoryEffects, NewLoad, NewTrip};
use haul_fleet::{AssignmentUpdate, Driver, LoadRole};
use haul_settlement::{ExpenseCategory, NewExpense, PaidBy};
use haul_state::{
    CloseEvidence, DeliveryEvidence, LoadPricing, OdometerStartEvidence, PaymentMethod,
    PickupEvidence,
};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        Ledger::new(),
        Effects::memory(Arc::new(MemoryEffects::default())),
        ComplianceGate::new(GateMode::Advisory),
    )
}

fn cents(raw: i64) -> Decimal {
    Decimal::new(raw, 2)
}

fn is_cent_precise(amount: Decimal) -> bool {
    round_cents(amount) == amount
}

const CATEGORIES: [ExpenseCategory; 5] = [
    ExpenseCategory::Fuel,
    ExpenseCategory::Tolls,
    ExpenseCategory::Lumper,
    ExpenseCategory::Parking,
    ExpenseCategory::DriverPay,
];

const PAYERS: [PaidBy; 4] = [
    PaidBy::CompanyCard,
    PaidBy::FuelCard,
    PaidBy::CompanyAccount,
    PaidBy::DriverPersonal,
];

const METHODS: [PaymentMethod; 3] = [
    PaymentMethod::Cash,
    PaymentMethod::Check,
    PaymentMethod::CreditCard,
];

#[derive(Debug, Clone)]
struct LoadPlan {
    rate_cents: i64,
    cuft: i64,
    collected: Option<(i64, usize)>,
}

#[derive(Debug, Clone)]
struct ExpensePlan {
    category: usize,
    payer: usize,
    amount_cents: i64,
}

fn load_plan() -> impl Strategy<Value = LoadPlan> {
    (
        10_000i64..500_000,
        1i64..2_000,
        proptest::option::of((100i64..50_000, 0usize..METHODS.len())),
    )
        .prop_map(|(rate_cents, cuft, collected)| LoadPlan {
            rate_cents,
            cuft,
            collected,
        })
}

fn expense_plan() -> impl Strategy<Value = ExpensePlan> {
    (0usize..CATEGORIES.len(), 0usize..PAYERS.len(), 1i64..100_000).prop_map(
        |(category, payer, amount_cents)| ExpensePlan {
            category,
            payer,
            amount_cents,
        },
    )
}

/// Builds a completed trip from the plans and returns its id.
fn completed_trip(
    d: &Dispatcher,
    owner: OwnerId,
    mode: PayMode,
    rate_milli: i64,
    miles: i64,
    loads: &[LoadPlan],
    expenses: &[ExpensePlan],
) -> TripId {
    let mut driver = Driver::new(owner, "Prop Driver");
    let mut comp = CompensationSnapshot::new(mode);
    comp.rate_per_mile = Some(Decimal::new(rate_milli, 3));
    comp.rate_per_cuft = Some(Decimal::new(rate_milli, 4));
    comp.percent_of_revenue = Some(Decimal::new(rate_milli % 100, 0));
    comp.daily_rate = Some(Decimal::new(rate_milli, 1));
    driver.compensation = Some(comp);
    let driver = d.upsert_driver(owner, driver).unwrap();

    let trip = d
        .create_trip(
            owner,
            NewTrip {
                trip_number: Some("T-PROP".into()),
                ..NewTrip::default()
            },
        )
        .unwrap()
        .id;
    d.update_trip_assignment(
        owner,
        trip,
        AssignmentUpdate {
            driver_id: Some(Some(driver.id)),
            ..AssignmentUpdate::default()
        },
    )
    .unwrap();

    for (i, plan) in loads.iter().enumerate() {
        let load = d
            .create_load(
                owner,
                NewLoad {
                    load_number: Some(format!("L-{i}")),
                    pricing: LoadPricing {
                        contract_rate: cents(plan.rate_cents),
                        accessorials: vec![],
                    },
                    ..NewLoad::default()
                },
            )
            .unwrap();
        d.accept_load(owner, load.id, None).unwrap();
        d.mark_pickup(
            owner,
            load.id,
            PickupEvidence {
                actual_cuft_loaded: Some(Decimal::from(plan.cuft)),
                ..PickupEvidence::default()
            },
        )
        .unwrap();
        d.attach_load(owner, trip, load.id, LoadRole::Primary).unwrap();
        d.start_delivery(owner, load.id, None).unwrap();
        d.complete_delivery(
            owner,
            load.id,
            DeliveryEvidence {
                delivery_photos: vec!["https://img/d.jpg".into()],
                collected_amount: plan.collected.map(|(c, _)| cents(c)),
                payment_method: plan.collected.map(|(_, m)| METHODS[m]),
                ..DeliveryEvidence::default()
            },
        )
        .unwrap();
    }

    for plan in expenses {
        d.add_expense(
            owner,
            trip,
            NewExpense {
                category: Some(CATEGORIES[plan.category]),
                amount: Some(cents(plan.amount_cents)),
                paid_by: Some(PAYERS[plan.payer]),
                receipt_url: Some("https://img/r.jpg".into()),
                ..NewExpense::default()
            },
        )
        .unwrap();
    }

    d.activate_trip(
        owner,
        trip,
        OdometerStartEvidence {
            odometer_start: Some(Decimal::from(100_000)),
            photo_url: Some("https://img/s.jpg".into()),
            actor: None,
        },
        None,
    )
    .unwrap();
    d.complete_trip(
        owner,
        trip,
        CloseEvidence {
            odometer_end: Some(Decimal::from(100_000 + miles)),
            photo_url: Some("https://img/e.jpg".into()),
            actor: None,
        },
    )
    .unwrap();
    trip
}

fn pay_mode() -> impl Strategy<Value = PayMode> {
    prop_oneof![
        Just(PayMode::PerMile),
        Just(PayMode::PerCuft),
        Just(PayMode::PerMileAndCuft),
        Just(PayMode::PercentOfRevenue),
        Just(PayMode::FlatDailyRate),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stored_totals_satisfy_profit_identity(
        mode in pay_mode(),
        rate_milli in 1i64..2_000,
        miles in 1i64..3_000,
        loads in proptest::collection::vec(load_plan(), 1..5),
        expenses in proptest::collection::vec(expense_plan(), 0..8),
    ) {
        let d = dispatcher();
        let owner = OwnerId::new();
        let trip_id = completed_trip(&d, owner, mode, rate_milli, miles, &loads, &expenses);
        let trip = d.get_trip(owner, trip_id).unwrap();
        let t = &trip.totals;

        let revenue: Decimal = loads.iter().map(|l| cents(l.rate_cents)).sum();
        prop_assert_eq!(t.revenue, revenue);
        prop_assert_eq!(t.total_cuft, Decimal::from(loads.iter().map(|l| l.cuft).sum::<i64>()));
        prop_assert_eq!(t.profit, t.revenue - (t.driver_pay + t.fuel + t.tolls + t.other_expenses));
        for figure in [t.revenue, t.driver_pay, t.fuel, t.tolls, t.other_expenses, t.profit] {
            prop_assert!(is_cent_precise(figure), "{} is not cent precise", figure);
        }
        prop_assert_eq!(trip.actual_miles, Some(Decimal::from(miles)));
    }

    #[test]
    fn preview_satisfies_net_identity(
        mode in pay_mode(),
        rate_milli in 1i64..2_000,
        miles in 1i64..3_000,
        loads in proptest::collection::vec(load_plan(), 1..4),
        expenses in proptest::collection::vec(expense_plan(), 0..6),
    ) {
        let d = dispatcher();
        let owner = OwnerId::new();
        let trip_id = completed_trip(&d, owner, mode, rate_milli, miles, &loads, &expenses);
        let preview = d.settlement_preview(owner, trip_id).unwrap();

        let reimbursements: Decimal = expenses
            .iter()
            .filter(|e| PAYERS[e.payer] == PaidBy::DriverPersonal)
            .map(|e| cents(e.amount_cents))
            .sum();
        let collections: Decimal = loads
            .iter()
            .filter_map(|l| l.collected)
            .filter(|(_, m)| METHODS[*m].counts_as_collection())
            .map(|(c, _)| cents(c))
            .sum();

        prop_assert_eq!(preview.reimbursements, reimbursements);
        prop_assert_eq!(preview.collections, collections);
        prop_assert_eq!(
            preview.net_pay,
            preview.gross_pay + preview.reimbursements - preview.collections
        );
        prop_assert!(is_cent_precise(preview.net_pay));
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum RosterOp {
    Attach(usize),
    Detach(usize),
    Reverse,
}

fn roster_op() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        3 => (0usize..6).prop_map(RosterOp::Attach),
        2 => (0usize..6).prop_map(RosterOp::Detach),
        1 => Just(RosterOp::Reverse),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn roster_stays_contiguous(ops in proptest::collection::vec(roster_op(), 1..30)) {
        let d = dispatcher();
        let owner = OwnerId::new();
        let trip = d
            .create_trip(owner, NewTrip { trip_number: Some("T-R".into()), ..NewTrip::default() })
            .unwrap()
            .id;
        let loads: Vec<LoadId> = (0..6)
            .map(|i| {
                d.create_load(owner, NewLoad { load_number: Some(format!("L-{i}")), ..NewLoad::default() })
                    .unwrap()
                    .id
            })
            .collect();

        for op in ops {
            match op {
                RosterOp::Attach(i) => {
                    let _ = d.attach_load(owner, trip, loads[i], LoadRole::Primary);
                }
                RosterOp::Detach(i) => {
                    let _ = d.detach_load(owner, trip, loads[i]);
                }
                RosterOp::Reverse => {
                    let mut order: Vec<LoadId> =
                        d.trip_links(owner, trip).unwrap().iter().map(|l| l.load_id).collect();
                    order.reverse();
                    if !order.is_empty() {
                        d.reorder_loads(owner, trip, &order).unwrap();
                    }
                }
            }

            let links = d.trip_links(owner, trip).unwrap();
            for (expected, link) in links.iter().enumerate() {
                prop_assert_eq!(link.sequence_index as usize, expected);
                let load = d.get_load(owner, link.load_id).unwrap();
                prop_assert_eq!(load.assignment.delivery_order, Some(expected as u32 + 1));
            }
            for id in &loads {
                if !links.iter().any(|l| l.load_id == *id) {
                    let load = d.get_load(owner, *id).unwrap();
                    prop_assert_eq!(load.assignment.delivery_order, None);
                }
            }
        }
    }
}
