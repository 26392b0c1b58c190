//! # Trip Status State Machine
//!
//! A trip wraps one driver, one truck, an optional trailer, and an ordered
//! set of loads.
//!
//! ```text
//! Planned ──▶ Active ──▶ EnRoute ──▶ Completed ──▶ Settled
//!    │          │  │         │           ▲
//!    │          │  └─────────┼───────────┘ (complete from Active)
//!    ▼          ▼            ▼
//! Cancelled  Cancelled   Cancelled
//! ```
//!
//! Activation and departure need odometer-start evidence. The closing
//! transitions (complete, settle) need both odometer readings with photos,
//! a strictly positive mileage, and every attached load delivered or in
//! storage. Mileage is derived from the odometer on every close.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{
    check_limit, require_text, CompensationSnapshot, Decimal, DriverId, LoadId, OwnerId, Timestamp,
    TrailerId, TripId, TruckId, ValidationError,
};

use crate::load::{Load, LoadStatus};
use crate::transition::{join_states, TransitionRecord};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Planned,
    Active,
    EnRoute,
    Completed,
    /// Driver has been paid out (terminal).
    Settled,
    /// Terminal.
    Cancelled,
}

impl TripStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TripStatus; 6] = [
        Self::Planned,
        Self::Active,
        Self::EnRoute,
        Self::Completed,
        Self::Settled,
        Self::Cancelled,
    ];

    /// Wire and database name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::EnRoute => "en_route",
            Self::Completed => "completed",
            Self::Settled => "settled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("status", format!("unknown trip status {s:?}")))
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A load that keeps a trip from closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLoad {
    pub load_id: LoadId,
    pub load_number: String,
    pub status: LoadStatus,
    pub destination: Option<String>,
}

/// Errors raised by trip transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TripError {
    /// The trip is not in a status the transition accepts.
    #[error("trip {trip_id} is {current}; expected {}", join_states(.expected))]
    StateMismatch {
        trip_id: TripId,
        current: TripStatus,
        expected: Vec<TripStatus>,
    },

    /// Required evidence was missing or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The odometer did not advance.
    #[error("odometer end {end} must be greater than odometer start {start}")]
    NonPositiveMileage { start: Decimal, end: Decimal },

    /// Attached loads are not yet delivered or in storage.
    #[error("trip {trip_id} has {} load(s) not yet delivered", pending_count(.pending))]
    LoadsPending {
        trip_id: TripId,
        pending: Vec<PendingLoad>,
    },
}

fn pending_count(pending: &[PendingLoad]) -> usize {
    pending.len()
}

// ─── Record types ────────────────────────────────────────────────────

/// Odometer readings and their proof photos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdometerReadings {
    pub start: Option<Decimal>,
    pub start_photo_url: Option<String>,
    pub end: Option<Decimal>,
    pub end_photo_url: Option<String>,
}

/// Rolled-up financial totals, written by the settlement engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripTotals {
    pub revenue: Decimal,
    pub driver_pay: Decimal,
    pub fuel: Decimal,
    pub tolls: Decimal,
    pub other_expenses: Decimal,
    pub profit: Decimal,
    pub total_cuft: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripTimestamps {
    pub created_at: Option<Timestamp>,
    pub activated_at: Option<Timestamp>,
    pub departed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub settled_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    /// Last time totals were recomputed.
    pub totals_computed_at: Option<Timestamp>,
}

/// A driver/equipment assignment spanning an ordered set of loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub owner_id: OwnerId,
    pub trip_number: String,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub driver_id: Option<DriverId>,
    #[serde(default)]
    pub truck_id: Option<TruckId>,
    #[serde(default)]
    pub trailer_id: Option<TrailerId>,
    /// Whether counterparty companies see the driver's name and phone.
    #[serde(default)]
    pub share_driver_with_companies: bool,
    #[serde(default)]
    pub odometer: OdometerReadings,
    #[serde(default)]
    pub actual_miles: Option<Decimal>,
    #[serde(default)]
    pub total_miles: Option<Decimal>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Pay terms captured when the driver was assigned.
    #[serde(default)]
    pub compensation: Option<CompensationSnapshot>,
    #[serde(default)]
    pub totals: TripTotals,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub timestamps: TripTimestamps,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord<TripStatus>>,
}

// ─── Evidence ────────────────────────────────────────────────────────

/// Odometer-start evidence for activation. Fields left empty fall back to
/// what the trip already records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OdometerStartEvidence {
    pub odometer_start: Option<Decimal>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Odometer-end evidence for the closing transitions. Fields left empty
/// fall back to what the trip already records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseEvidence {
    pub odometer_end: Option<Decimal>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

// ─── Trip ────────────────────────────────────────────────────────────

impl Trip {
    /// Create a planned trip.
    pub fn new(owner_id: OwnerId, trip_number: impl Into<String>) -> Self {
        Self {
            id: TripId::new(),
            owner_id,
            trip_number: trip_number.into(),
            status: TripStatus::Planned,
            driver_id: None,
            truck_id: None,
            trailer_id: None,
            share_driver_with_companies: false,
            odometer: OdometerReadings::default(),
            actual_miles: None,
            total_miles: None,
            start_date: None,
            end_date: None,
            compensation: None,
            totals: TripTotals::default(),
            cancellation_reason: None,
            timestamps: TripTimestamps {
                created_at: Some(Timestamp::now()),
                ..TripTimestamps::default()
            },
            transitions: Vec::new(),
        }
    }

    /// Miles used for pay: recorded miles, else the odometer difference.
    pub fn miles(&self) -> Decimal {
        if let Some(miles) = self.total_miles.or(self.actual_miles) {
            return miles;
        }
        match (self.odometer.start, self.odometer.end) {
            (Some(start), Some(end)) if end > start => end - start,
            _ => Decimal::ZERO,
        }
    }

    /// PLANNED → ACTIVE.
    pub fn activate(&mut self, evidence: OdometerStartEvidence) -> Result<(), TripError> {
        self.require_state(&[TripStatus::Planned])?;
        let (start, photo) = self.resolve_start(evidence.odometer_start, evidence.photo_url)?;

        let now = Timestamp::now();
        self.odometer.start = Some(start);
        self.odometer.start_photo_url = Some(photo);
        self.timestamps.activated_at = Some(now);
        self.do_transition(TripStatus::Active, now, evidence.actor, None);
        Ok(())
    }

    /// ACTIVE → EN_ROUTE.
    pub fn depart(&mut self, actor: Option<String>) -> Result<(), TripError> {
        self.require_state(&[TripStatus::Active])?;
        self.resolve_start(None, None)?;

        let now = Timestamp::now();
        self.timestamps.departed_at = Some(now);
        self.do_transition(TripStatus::EnRoute, now, actor, None);
        Ok(())
    }

    /// ACTIVE | EN_ROUTE → COMPLETED.
    ///
    /// `loads` are the loads currently attached to this trip.
    pub fn complete(&mut self, evidence: CloseEvidence, loads: &[Load]) -> Result<(), TripError> {
        self.require_state(&[TripStatus::Active, TripStatus::EnRoute])?;
        let now = Timestamp::now();
        self.close(evidence, loads, TripStatus::Completed, now)?;
        self.timestamps.completed_at = Some(now);
        Ok(())
    }

    /// COMPLETED → SETTLED, re-checking the closing conditions.
    pub fn settle(&mut self, evidence: CloseEvidence, loads: &[Load]) -> Result<(), TripError> {
        self.require_state(&[TripStatus::Completed])?;
        let now = Timestamp::now();
        self.close(evidence, loads, TripStatus::Settled, now)?;
        self.timestamps.settled_at = Some(now);
        Ok(())
    }

    /// PLANNED | ACTIVE | EN_ROUTE → CANCELLED.
    pub fn cancel(&mut self, reason: Option<String>, actor: Option<String>) -> Result<(), TripError> {
        self.require_state(&[TripStatus::Planned, TripStatus::Active, TripStatus::EnRoute])?;
        let reason = require_text(reason.as_deref(), "cancellation_reason")?.to_string();

        let now = Timestamp::now();
        self.cancellation_reason = Some(reason.clone());
        self.timestamps.cancelled_at = Some(now);
        self.do_transition(TripStatus::Cancelled, now, actor, Some(reason));
        Ok(())
    }

    /// Attached loads that are neither delivered nor in storage.
    pub fn pending_loads(loads: &[Load]) -> Vec<PendingLoad> {
        loads
            .iter()
            .filter(|load| !load.status.is_finished())
            .map(|load| PendingLoad {
                load_id: load.id,
                load_number: load.load_number.clone(),
                status: load.status,
                destination: load.destination.clone(),
            })
            .collect()
    }

    fn resolve_start(
        &self,
        supplied: Option<Decimal>,
        photo: Option<String>,
    ) -> Result<(Decimal, String), TripError> {
        let start = supplied
            .or(self.odometer.start)
            .ok_or(ValidationError::missing("odometer_start"))?;
        if start < Decimal::ZERO {
            return Err(ValidationError::invalid("odometer_start", "must not be negative").into());
        }
        check_limit("odometer_start", start)?;
        let photo = photo
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.odometer.start_photo_url.clone());
        let photo = require_text(photo.as_deref(), "odometer_start_photo")?.to_string();
        Ok((start, photo))
    }

    /// Shared checks and bookkeeping for complete and settle.
    fn close(
        &mut self,
        evidence: CloseEvidence,
        loads: &[Load],
        to: TripStatus,
        now: Timestamp,
    ) -> Result<(), TripError> {
        let (start, start_photo) = self.resolve_start(None, None)?;
        let end = evidence
            .odometer_end
            .or(self.odometer.end)
            .ok_or(ValidationError::missing("odometer_end"))?;
        check_limit("odometer_end", end)?;
        let end_photo = evidence
            .photo_url
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.odometer.end_photo_url.clone());
        let end_photo = require_text(end_photo.as_deref(), "odometer_end_photo")?.to_string();
        if end <= start {
            return Err(TripError::NonPositiveMileage { start, end });
        }

        let pending = Self::pending_loads(loads);
        if !pending.is_empty() {
            return Err(TripError::LoadsPending {
                trip_id: self.id,
                pending,
            });
        }

        let miles = end - start;
        self.odometer.start_photo_url = Some(start_photo);
        self.odometer.end = Some(end);
        self.odometer.end_photo_url = Some(end_photo);
        self.actual_miles = Some(miles);
        self.total_miles = Some(miles);
        self.do_transition(to, now, evidence.actor, None);
        Ok(())
    }

    fn require_state(&self, expected: &[TripStatus]) -> Result<(), TripError> {
        if expected.contains(&self.status) {
            Ok(())
        } else {
            Err(TripError::StateMismatch {
                trip_id: self.id,
                current: self.status,
                expected: expected.to_vec(),
            })
        }
    }

    fn do_transition(
        &mut self,
        to: TripStatus,
        at: Timestamp,
        actor: Option<String>,
        note: Option<String>,
    ) {
        self.transitions.push(TransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: at,
            actor,
            note,
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn miles(n: i64) -> Option<Decimal> {
        Some(Decimal::new(n, 0))
    }

    fn planned() -> Trip {
        Trip::new(OwnerId::new(), "T-100")
    }

    fn active() -> Trip {
        let mut trip = planned();
        trip.activate(OdometerStartEvidence {
            odometer_start: miles(50_000),
            photo_url: Some("odo-start.jpg".into()),
            actor: None,
        })
        .unwrap();
        trip
    }

    fn load_with(owner: OwnerId, status: LoadStatus) -> Load {
        let mut load = Load::new(owner, "L-1");
        load.status = status;
        load.destination = Some("Denver, CO".into());
        load
    }

    fn close_at(end: i64) -> CloseEvidence {
        CloseEvidence {
            odometer_end: miles(end),
            photo_url: Some("odo-end.jpg".into()),
            actor: None,
        }
    }

    #[test]
    fn activation_requires_start_reading_and_photo() {
        let mut trip = planned();
        let err = trip.activate(OdometerStartEvidence::default()).unwrap_err();
        assert_eq!(err, TripError::Validation(ValidationError::missing("odometer_start")));

        let err = trip
            .activate(OdometerStartEvidence {
                odometer_start: miles(50_000),
                photo_url: None,
                actor: None,
            })
            .unwrap_err();
        assert_eq!(
            err,
            TripError::Validation(ValidationError::missing("odometer_start_photo"))
        );
        assert_eq!(trip.status, TripStatus::Planned);
        assert!(trip.odometer.start.is_none());

        trip.activate(OdometerStartEvidence {
            odometer_start: miles(50_000),
            photo_url: Some("odo.jpg".into()),
            actor: None,
        })
        .unwrap();
        assert_eq!(trip.status, TripStatus::Active);
        assert!(trip.timestamps.activated_at.is_some());
    }

    #[test]
    fn activation_uses_previously_recorded_reading() {
        let mut trip = planned();
        trip.odometer.start = miles(12_000);
        trip.odometer.start_photo_url = Some("earlier.jpg".into());
        trip.activate(OdometerStartEvidence::default()).unwrap();
        assert_eq!(trip.odometer.start, miles(12_000));
    }

    #[test]
    fn depart_moves_to_en_route() {
        let mut trip = active();
        trip.depart(None).unwrap();
        assert_eq!(trip.status, TripStatus::EnRoute);
        assert!(trip.depart(None).is_err());
    }

    #[test]
    fn complete_reports_each_pending_load() {
        let mut trip = active();
        let owner = trip.owner_id;
        let delivered = load_with(owner, LoadStatus::Delivered);
        let loading = load_with(owner, LoadStatus::Loading);
        let err = trip
            .complete(close_at(50_450), &[delivered, loading.clone()])
            .unwrap_err();
        match err {
            TripError::LoadsPending { pending, .. } => {
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].load_id, loading.id);
                assert_eq!(pending[0].status, LoadStatus::Loading);
                assert_eq!(pending[0].destination.as_deref(), Some("Denver, CO"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(trip.status, TripStatus::Active);
        assert!(trip.actual_miles.is_none());
    }

    #[test]
    fn complete_sets_miles_from_odometer() {
        let mut trip = active();
        let owner = trip.owner_id;
        let loads = vec![
            load_with(owner, LoadStatus::Delivered),
            load_with(owner, LoadStatus::StorageCompleted),
        ];
        trip.complete(close_at(50_450), &loads).unwrap();
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.actual_miles, miles(450));
        assert_eq!(trip.total_miles, miles(450));
        assert_eq!(trip.miles(), Decimal::new(450, 0));
    }

    #[test]
    fn odometer_must_advance() {
        let mut trip = active();
        let err = trip.complete(close_at(50_000), &[]).unwrap_err();
        assert!(matches!(err, TripError::NonPositiveMileage { .. }));
        let err = trip.complete(close_at(49_000), &[]).unwrap_err();
        assert!(matches!(err, TripError::NonPositiveMileage { .. }));
    }

    #[test]
    fn closing_needs_end_photo() {
        let mut trip = active();
        let err = trip
            .complete(
                CloseEvidence {
                    odometer_end: miles(50_450),
                    photo_url: None,
                    actor: None,
                },
                &[],
            )
            .unwrap_err();
        assert_eq!(
            err,
            TripError::Validation(ValidationError::missing("odometer_end_photo"))
        );
    }

    #[test]
    fn settle_only_after_completion() {
        let mut trip = active();
        let err = trip.settle(close_at(50_450), &[]).unwrap_err();
        assert!(matches!(
            err,
            TripError::StateMismatch { current: TripStatus::Active, .. }
        ));

        trip.complete(close_at(50_450), &[]).unwrap();
        trip.settle(CloseEvidence::default(), &[]).unwrap();
        assert_eq!(trip.status, TripStatus::Settled);
        assert!(trip.status.is_terminal());
        assert_eq!(trip.transitions.len(), 3);
    }

    #[test]
    fn cancel_from_open_states_only() {
        let mut trip = active();
        trip.cancel(Some("driver sick".into()), None).unwrap();
        assert_eq!(trip.status, TripStatus::Cancelled);
        assert!(trip.cancel(Some("again".into()), None).is_err());

        let mut trip = active();
        trip.complete(close_at(50_100), &[]).unwrap();
        assert!(matches!(
            trip.cancel(Some("too late".into()), None),
            Err(TripError::StateMismatch { .. })
        ));
    }

    #[test]
    fn status_names() {
        assert_eq!(TripStatus::EnRoute.to_string(), "en_route");
        assert_eq!(
            serde_json::to_string(&TripStatus::Settled).unwrap(),
            "\"settled\""
        );
        for status in TripStatus::ALL {
            assert_eq!(status.as_str().parse::<TripStatus>().unwrap(), status);
        }
    }
}
