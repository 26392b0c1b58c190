//! # Driver Compensation Snapshot
//!
//! A driver's pay terms are copied onto a trip when the driver is assigned.
//! Later edits to the driver's record never reach trips that already carry a
//! snapshot; settlement always pays on the terms in force at assignment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// How a driver's gross pay is computed for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayMode {
    /// Miles driven × rate per mile.
    PerMile,
    /// Cubic feet hauled × rate per cubic foot.
    PerCuft,
    /// Both mileage and volume components, summed.
    PerMileAndCuft,
    /// A percentage of the trip's load revenue.
    PercentOfRevenue,
    /// A flat rate for each calendar day worked.
    FlatDailyRate,
}

impl PayMode {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerMile => "per_mile",
            Self::PerCuft => "per_cuft",
            Self::PerMileAndCuft => "per_mile_and_cuft",
            Self::PercentOfRevenue => "percent_of_revenue",
            Self::FlatDailyRate => "flat_daily_rate",
        }
    }
}

impl std::fmt::Display for PayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PayMode {
    type Err = crate::error::HaulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_mile" => Ok(Self::PerMile),
            "per_cuft" => Ok(Self::PerCuft),
            "per_mile_and_cuft" => Ok(Self::PerMileAndCuft),
            "percent_of_revenue" => Ok(Self::PercentOfRevenue),
            "flat_daily_rate" => Ok(Self::FlatDailyRate),
            other => Err(crate::error::HaulError::Parse(format!(
                "unknown pay mode {other:?}"
            ))),
        }
    }
}

/// Pay terms captured onto a trip. Rates not used by `pay_mode` are ignored;
/// a missing rate the mode needs counts as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationSnapshot {
    pub pay_mode: PayMode,
    #[serde(default)]
    pub rate_per_mile: Option<Decimal>,
    #[serde(default)]
    pub rate_per_cuft: Option<Decimal>,
    #[serde(default)]
    pub percent_of_revenue: Option<Decimal>,
    #[serde(default)]
    pub daily_rate: Option<Decimal>,
    /// When the snapshot was taken. Absent on hand-written inputs.
    #[serde(default)]
    pub captured_at: Option<Timestamp>,
}

impl CompensationSnapshot {
    /// A snapshot with only the pay mode set.
    pub fn new(pay_mode: PayMode) -> Self {
        Self {
            pay_mode,
            rate_per_mile: None,
            rate_per_cuft: None,
            percent_of_revenue: None,
            daily_rate: None,
            captured_at: None,
        }
    }

    /// Copy these terms, stamping the capture time.
    pub fn captured(&self, at: Timestamp) -> Self {
        Self {
            captured_at: Some(at),
            ..self.clone()
        }
    }
}
