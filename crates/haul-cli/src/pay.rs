//! # Pay Subcommand
//!
//! Computes gross driver pay for one set of trip figures without building
//! a trip. Useful for quoting a driver before dispatch.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use haul_core::{CompensationSnapshot, PayMode};
use haul_settlement::{driver_gross_pay, PayBreakdown, PayInputs};

use crate::output::to_pretty;

/// Arguments for `haul pay`.
#[derive(Args, Debug)]
pub struct PayArgs {
    /// Pay mode: per_mile, per_cuft, per_mile_and_cuft, percent_of_revenue,
    /// or flat_daily_rate.
    #[arg(long, value_parser = parse_pay_mode)]
    pub mode: PayMode,

    #[arg(long)]
    pub rate_per_mile: Option<Decimal>,

    #[arg(long)]
    pub rate_per_cuft: Option<Decimal>,

    /// Percentage of revenue, e.g. `25` for 25%.
    #[arg(long)]
    pub percent_of_revenue: Option<Decimal>,

    #[arg(long)]
    pub daily_rate: Option<Decimal>,

    #[arg(long, default_value = "0")]
    pub miles: Decimal,

    #[arg(long, default_value = "0")]
    pub cubic_feet: Decimal,

    #[arg(long, default_value = "0")]
    pub revenue: Decimal,

    /// First day worked, YYYY-MM-DD.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day worked, YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Print the breakdown as JSON.
    #[arg(long)]
    pub json: bool,
}

fn parse_pay_mode(raw: &str) -> Result<PayMode, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown pay mode '{raw}'"))
}

impl PayArgs {
    fn snapshot(&self) -> CompensationSnapshot {
        let mut snapshot = CompensationSnapshot::new(self.mode);
        snapshot.rate_per_mile = self.rate_per_mile;
        snapshot.rate_per_cuft = self.rate_per_cuft;
        snapshot.percent_of_revenue = self.percent_of_revenue;
        snapshot.daily_rate = self.daily_rate;
        snapshot
    }

    fn inputs(&self) -> PayInputs {
        PayInputs {
            miles: self.miles,
            cubic_feet: self.cubic_feet,
            revenue: self.revenue,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Compute the breakdown for `args`.
pub fn compute(args: &PayArgs) -> PayBreakdown {
    driver_gross_pay(&args.snapshot(), &args.inputs())
}

/// Execute `haul pay`.
pub fn run_pay(args: &PayArgs) -> Result<u8> {
    if let (Some(start), Some(end)) = (args.start_date, args.end_date) {
        if end < start {
            anyhow::bail!("end date {end} is before start date {start}");
        }
    }

    let breakdown = compute(args);
    tracing::info!(mode = breakdown.pay_mode.as_str(), gross = %breakdown.gross, "computed driver pay");

    if args.json {
        println!("{}", to_pretty(&breakdown)?);
    } else {
        println!("{}", render(&breakdown));
    }
    Ok(0)
}

fn render(breakdown: &PayBreakdown) -> String {
    let mut lines = vec![format!("pay mode:       {}", breakdown.pay_mode.as_str())];
    let components = [
        ("mileage pay", breakdown.mileage_pay),
        ("volume pay", breakdown.volume_pay),
        ("revenue share", breakdown.revenue_share),
        ("daily pay", breakdown.daily_pay),
    ];
    for (label, amount) in components {
        if !amount.is_zero() {
            lines.push(format!("{:<15} {amount}", format!("{label}:")));
        }
    }
    if let Some(days) = breakdown.days_worked {
        lines.push(format!("days worked:    {days}"));
    }
    lines.push(format!("gross:          {}", breakdown.gross));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn args(mode: PayMode) -> PayArgs {
        PayArgs {
            mode,
            rate_per_mile: None,
            rate_per_cuft: None,
            percent_of_revenue: None,
            daily_rate: None,
            miles: Decimal::ZERO,
            cubic_feet: Decimal::ZERO,
            revenue: Decimal::ZERO,
            start_date: None,
            end_date: None,
            json: false,
        }
    }

    #[test]
    fn parses_snake_case_modes() {
        assert_eq!(parse_pay_mode("per_mile").unwrap(), PayMode::PerMile);
        assert_eq!(
            parse_pay_mode("flat_daily_rate").unwrap(),
            PayMode::FlatDailyRate
        );
        assert!(parse_pay_mode("hourly").is_err());
    }

    #[test]
    fn per_mile_quote() {
        let mut a = args(PayMode::PerMile);
        a.rate_per_mile = Some(dec("0.55"));
        a.miles = dec("1200");
        let breakdown = compute(&a);
        assert_eq!(breakdown.gross, dec("660"));
        assert!(render(&breakdown).contains("mileage pay:"));
    }

    #[test]
    fn flat_daily_counts_days_inclusive() {
        let mut a = args(PayMode::FlatDailyRate);
        a.daily_rate = Some(dec("200"));
        a.start_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        a.end_date = NaiveDate::from_ymd_opt(2026, 3, 3);
        let breakdown = compute(&a);
        assert_eq!(breakdown.days_worked, Some(3));
        assert_eq!(breakdown.gross, dec("600"));
        assert!(render(&breakdown).contains("days worked:    3"));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut a = args(PayMode::FlatDailyRate);
        a.start_date = NaiveDate::from_ymd_opt(2026, 3, 5);
        a.end_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert!(run_pay(&a).is_err());
    }
}
