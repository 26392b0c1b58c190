//! # Driver Pay
//!
//! | mode | gross |
//! |---|---|
//! | per_mile | miles × rate_per_mile |
//! | per_cuft | cubic_feet × rate_per_cuft |
//! | per_mile_and_cuft | (miles × rate_per_mile) + (cubic_feet × rate_per_cuft) |
//! | percent_of_revenue | revenue × percent / 100 |
//! | flat_daily_rate | days_worked × daily_rate |
//!
//! Each component is rounded to cents before the components are summed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use haul_core::{
    inclusive_days, percent_of, sum_cents, times_rate, CompensationSnapshot, Decimal, PayMode,
};

/// Trip figures pay is computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayInputs {
    #[serde(default)]
    pub miles: Decimal,
    #[serde(default)]
    pub cubic_feet: Decimal,
    #[serde(default)]
    pub revenue: Decimal,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl PayInputs {
    /// Inclusive calendar days between the trip dates, minimum 1.
    ///
    /// A missing end date counts as the start date.
    pub fn days_worked(&self) -> i64 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => inclusive_days(start, end),
            _ => 1,
        }
    }
}

/// Gross pay with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayBreakdown {
    pub pay_mode: PayMode,
    pub mileage_pay: Decimal,
    pub volume_pay: Decimal,
    pub revenue_share: Decimal,
    pub daily_pay: Decimal,
    /// Set only for `flat_daily_rate`.
    pub days_worked: Option<i64>,
    pub gross: Decimal,
}

/// Driver gross pay for `inputs` under `snapshot`.
///
/// A rate the pay mode needs but the snapshot lacks counts as zero.
pub fn driver_gross_pay(snapshot: &CompensationSnapshot, inputs: &PayInputs) -> PayBreakdown {
    let rate = |r: Option<Decimal>| r.unwrap_or(Decimal::ZERO);
    let mut breakdown = PayBreakdown {
        pay_mode: snapshot.pay_mode,
        mileage_pay: Decimal::ZERO,
        volume_pay: Decimal::ZERO,
        revenue_share: Decimal::ZERO,
        daily_pay: Decimal::ZERO,
        days_worked: None,
        gross: Decimal::ZERO,
    };

    match snapshot.pay_mode {
        PayMode::PerMile => {
            breakdown.mileage_pay = times_rate(inputs.miles, rate(snapshot.rate_per_mile));
        }
        PayMode::PerCuft => {
            breakdown.volume_pay = times_rate(inputs.cubic_feet, rate(snapshot.rate_per_cuft));
        }
        PayMode::PerMileAndCuft => {
            breakdown.mileage_pay = times_rate(inputs.miles, rate(snapshot.rate_per_mile));
            breakdown.volume_pay = times_rate(inputs.cubic_feet, rate(snapshot.rate_per_cuft));
        }
        PayMode::PercentOfRevenue => {
            breakdown.revenue_share =
                percent_of(inputs.revenue, rate(snapshot.percent_of_revenue));
        }
        PayMode::FlatDailyRate => {
            let days = inputs.days_worked();
            breakdown.days_worked = Some(days);
            breakdown.daily_pay = times_rate(Decimal::from(days), rate(snapshot.daily_rate));
        }
    }

    breakdown.gross = sum_cents([
        breakdown.mileage_pay,
        breakdown.volume_pay,
        breakdown.revenue_share,
        breakdown.daily_pay,
    ]);
    breakdown
}
