//! # Dispatcher
//!
//! Owner-scoped lifecycle operations over the [`Ledger`]. Every public
//! method takes the calling owner explicitly; a record belonging to anyone
//! else is reported as not found.
//!
//! Each operation is a synchronous read-modify-write. Status transitions run
//! inside [`Store::try_update_owned`](crate::store::Store::try_update_owned),
//! so two callers racing on the same record cannot both win. Trip transitions
//! also hold the roster read lock while they check attached loads, and roster
//! changes re-check trip status under the roster write lock, so a load cannot
//! join a trip in the middle of its completion. Derived data is refreshed
//! afterwards:
//!
//! - trip driver/equipment changes are copied onto attached loads,
//! - roster changes rewrite delivery orders,
//! - any change to loads, expenses, odometer, or dates recomputes the trip's
//!   financials.
//!
//! Audit events, thread messages, and driver notifications go through
//! [`Effects`] and never fail the operation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use haul_compliance::{
    evaluate_driver, evaluate_partnership_document, evaluate_trailer, evaluate_truck,
    ComplianceBlocked, ComplianceGate, ComplianceItem, ComplianceReport, GateMode,
    PartnershipDocument,
};
use haul_core::{
    check_limit, require_text, round_cents, CompanyId, Decimal, DriverId, ExpenseId, LoadId, OwnerId,
    Timestamp, TrailerId, TripId, TruckId, ValidationError,
};
use haul_fleet::{
    apply_assignment, apply_to_load, clear_from_load, AssignmentSource, AssignmentUpdate, Driver,
    FleetDirectory, LoadRole, Trailer, Truck, TripLoad,
};
use haul_settlement::{
    compute_trip_financials, ensure_open, recompute, settlement_preview, NewExpense,
    SettlementPreview, TripExpense, TripFinancials,
};
use haul_state::{
    AccessorialCharge, CancelEvidence, CloseEvidence, DeliveryEvidence, FinishLoadingEvidence,
    Load, LoadError, LoadPricing, LoadStatus, LoadView, OdometerStartEvidence, PickupEvidence,
    StartLoadingEvidence, StorageDropEvidence, Trip, TripError, TripStatus,
};

use crate::effects::{AuditEvent, Effects, Notification, NotificationKind};
use crate::error::{DispatchError, DispatchResult};
use crate::store::{Ledger, Owned, PartnerDocumentRecord, Store};

/// Trip statuses that still accept assignment, expense, and detail changes.
const OPEN_TRIP_STATES: [TripStatus; 4] = [
    TripStatus::Planned,
    TripStatus::Active,
    TripStatus::EnRoute,
    TripStatus::Completed,
];

/// Trip statuses whose roster can still change. A completed trip has already
/// passed the pending-load check and keeps the loads it closed with.
const ROSTER_OPEN_STATES: [TripStatus; 3] =
    [TripStatus::Planned, TripStatus::Active, TripStatus::EnRoute];

// ─── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLoad {
    pub load_number: Option<String>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub pricing: LoadPricing,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTrip {
    pub trip_number: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignment: AssignmentUpdate,
}

/// Dates and odometer readings recorded outside a transition. Absent fields
/// are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripDetailsUpdate {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub odometer_start: Option<Decimal>,
    #[serde(default)]
    pub odometer_start_photo: Option<String>,
    #[serde(default)]
    pub odometer_end: Option<Decimal>,
    #[serde(default)]
    pub odometer_end_photo: Option<String>,
    #[serde(default)]
    pub total_miles: Option<Decimal>,
}

impl TripDetailsUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        bounded("odometer_start", self.odometer_start)?;
        bounded("odometer_end", self.odometer_end)?;
        bounded("total_miles", self.total_miles)?;
        Ok(())
    }
}

/// A trip after a gated transition, with whatever the gate flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatedTrip {
    pub trip: Trip,
    pub compliance: Vec<ComplianceItem>,
}

// ─── Owner-scoped fleet directory ────────────────────────────────────

struct OwnerFleet<'a> {
    ledger: &'a Ledger,
    owner: OwnerId,
}

impl FleetDirectory for OwnerFleet<'_> {
    fn driver(&self, id: DriverId) -> Option<Driver> {
        self.ledger.drivers.get_owned(&id, self.owner)
    }

    fn truck(&self, id: TruckId) -> Option<Truck> {
        self.ledger.trucks.get_owned(&id, self.owner)
    }

    fn trailer(&self, id: TrailerId) -> Option<Trailer> {
        self.ledger.trailers.get_owned(&id, self.owner)
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    ledger: Ledger,
    effects: Effects,
    gate: ComplianceGate,
}

impl Dispatcher {
    pub fn new(ledger: Ledger, effects: Effects, gate: ComplianceGate) -> Self {
        Self {
            ledger,
            effects,
            gate,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Default gate applied when a transition does not name a mode.
    pub fn gate(&self) -> ComplianceGate {
        self.gate
    }

    fn directory(&self, owner: OwnerId) -> OwnerFleet<'_> {
        OwnerFleet {
            ledger: &self.ledger,
            owner,
        }
    }

    // ── Loads ───────────────────────────────────────────────────────

    pub fn create_load(&self, owner: OwnerId, new: NewLoad) -> DispatchResult<Load> {
        let number = require_text(new.load_number.as_deref(), "load_number")?;
        let mut load = Load::new(owner, number);
        load.company_id = new.company_id;
        load.destination = new.destination;
        load.pricing = validate_pricing(new.pricing)?;
        self.ledger.loads.insert(load.id, load.clone());

        tracing::info!(load_id = %load.id, load_number = %load.load_number, "load created");
        self.audit(
            "load",
            load.id,
            "load.created",
            None,
            json!({ "load_number": load.load_number }),
        );
        Ok(load)
    }

    pub fn get_load(&self, owner: OwnerId, load_id: LoadId) -> DispatchResult<Load> {
        self.ledger
            .loads
            .get_owned(&load_id, owner)
            .ok_or(DispatchError::not_found("load"))
    }

    /// The counterparty view, honouring the trip's driver-sharing flag.
    pub fn load_view(&self, owner: OwnerId, load_id: LoadId) -> DispatchResult<LoadView> {
        self.get_load(owner, load_id).map(|load| load.view())
    }

    /// The owner's loads, oldest first, optionally filtered by status.
    pub fn list_loads(&self, owner: OwnerId, status: Option<LoadStatus>) -> Vec<Load> {
        let mut loads = self.ledger.loads.filter(|load| {
            load.owner_id == owner && status.map_or(true, |s| load.status == s)
        });
        loads.sort_by(|a, b| {
            (a.timestamps.created_at, &a.load_number).cmp(&(b.timestamps.created_at, &b.load_number))
        });
        loads
    }

    pub fn accept_load(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        actor: Option<String>,
    ) -> DispatchResult<Load> {
        self.transition_load(owner, load_id, "load.accepted", actor.clone(), |load| {
            load.accept(actor)
        })
    }

    pub fn start_loading(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: StartLoadingEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.loading_started", actor, |load| {
            load.start_loading(evidence)
        })
    }

    pub fn finish_loading(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: FinishLoadingEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.loading_finished", actor, |load| {
            load.finish_loading(evidence)
        })
    }

    pub fn mark_pickup(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: PickupEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.picked_up", actor, |load| {
            load.mark_pickup(evidence)
        })
    }

    pub fn start_delivery(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        actor: Option<String>,
    ) -> DispatchResult<Load> {
        self.transition_load(owner, load_id, "load.delivery_started", actor.clone(), |load| {
            load.start_delivery(actor)
        })
    }

    pub fn complete_delivery(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: DeliveryEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.delivered", actor, |load| {
            load.complete_delivery(evidence)
        })
    }

    pub fn set_storage_drop(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: StorageDropEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.storage_dropped", actor, |load| {
            load.set_storage_drop(evidence)
        })
    }

    pub fn cancel_load(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        evidence: CancelEvidence,
    ) -> DispatchResult<Load> {
        let actor = evidence.actor.clone();
        self.transition_load(owner, load_id, "load.cancelled", actor, |load| {
            load.cancel(evidence)
        })
    }

    /// Replace a load's contract rate and accessorials.
    pub fn update_load_pricing(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        pricing: LoadPricing,
    ) -> DispatchResult<Load> {
        let pricing = validate_pricing(pricing)?;
        let load = self
            .ledger
            .loads
            .try_update_owned(&load_id, owner, |load| {
                load.pricing = pricing;
                Ok::<_, DispatchError>(load.clone())
            })
            .ok_or(DispatchError::not_found("load"))??;

        self.audit(
            "load",
            load_id,
            "load.pricing_updated",
            None,
            json!({ "total_rate": load.total_rate() }),
        );
        if let Some(trip_id) = self.trip_for_load(load_id) {
            self.refresh_financials(trip_id);
        }
        Ok(load)
    }

    fn transition_load(
        &self,
        owner: OwnerId,
        load_id: LoadId,
        action: &'static str,
        actor: Option<String>,
        f: impl FnOnce(&mut Load) -> Result<(), LoadError>,
    ) -> DispatchResult<Load> {
        let (from, load) = self
            .ledger
            .loads
            .try_update_owned(&load_id, owner, |load| {
                let from = load.status;
                f(load).map(|()| (from, load.clone()))
            })
            .ok_or(DispatchError::not_found("load"))??;

        tracing::info!(%load_id, %from, to = %load.status, action, "load transition");
        self.audit(
            "load",
            load_id,
            action,
            actor,
            json!({ "from": from, "to": load.status }),
        );
        self.effects.message(
            load_id.to_string(),
            format!(
                "Load {} moved from {} to {}",
                load.load_number, from, load.status
            ),
        );
        if let Some(trip_id) = self.trip_for_load(load_id) {
            self.refresh_financials(trip_id);
        }
        Ok(load)
    }

    // ── Trips ───────────────────────────────────────────────────────

    /// Create a planned trip, applying any initial driver and equipment.
    pub fn create_trip(&self, owner: OwnerId, new: NewTrip) -> DispatchResult<Trip> {
        let number = require_text(new.trip_number.as_deref(), "trip_number")?;
        check_dates(new.start_date, new.end_date)?;
        let mut trip = Trip::new(owner, number);
        trip.start_date = new.start_date;
        trip.end_date = new.end_date;
        let outcome = apply_assignment(&mut trip, &new.assignment, &self.directory(owner))?;
        self.ledger.trips.insert(trip.id, trip.clone());

        tracing::info!(trip_id = %trip.id, trip_number = %trip.trip_number, "trip created");
        self.audit(
            "trip",
            trip.id,
            "trip.created",
            None,
            json!({
                "trip_number": trip.trip_number,
                "driver_id": trip.driver_id,
                "truck_id": trip.truck_id,
                "trailer_id": trip.trailer_id,
            }),
        );
        if outcome.driver_assigned {
            self.notify(
                trip.driver_id,
                NotificationKind::TripAssigned,
                &trip,
                None,
                format!("You have been assigned to trip {}", trip.trip_number),
            );
        }
        Ok(trip)
    }

    pub fn get_trip(&self, owner: OwnerId, trip_id: TripId) -> DispatchResult<Trip> {
        self.ledger
            .trips
            .get_owned(&trip_id, owner)
            .ok_or(DispatchError::not_found("trip"))
    }

    pub fn list_trips(&self, owner: OwnerId, status: Option<TripStatus>) -> Vec<Trip> {
        let mut trips = self.ledger.trips.filter(|trip| {
            trip.owner_id == owner && status.map_or(true, |s| trip.status == s)
        });
        trips.sort_by(|a, b| {
            (a.timestamps.created_at, &a.trip_number).cmp(&(b.timestamps.created_at, &b.trip_number))
        });
        trips
    }

    /// Change the trip's driver, truck, trailer, or sharing flag and copy the
    /// result onto every attached load.
    pub fn update_trip_assignment(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        update: AssignmentUpdate,
    ) -> DispatchResult<Trip> {
        let directory = self.directory(owner);
        let (trip, outcome) = self
            .ledger
            .trips
            .try_update_owned(&trip_id, owner, |trip| {
                ensure_trip_open(trip)?;
                let outcome = apply_assignment(trip, &update, &directory)?;
                Ok::<_, DispatchError>((trip.clone(), outcome))
            })
            .ok_or(DispatchError::not_found("trip"))??;

        if outcome.touches_loads() {
            let updated = self.propagate_assignment(&trip, outcome.driver.as_ref());
            tracing::info!(%trip_id, loads = updated, "trip assignment propagated");
        }
        if outcome.driver_assigned || outcome.driver_cleared {
            if let Some(previous) = outcome.previous_driver_id {
                self.notify(
                    Some(previous),
                    NotificationKind::TripUnassigned,
                    &trip,
                    None,
                    format!("You have been removed from trip {}", trip.trip_number),
                );
            }
        }
        if outcome.driver_assigned {
            self.notify(
                trip.driver_id,
                NotificationKind::TripAssigned,
                &trip,
                None,
                format!("You have been assigned to trip {}", trip.trip_number),
            );
            self.effects.message(
                trip_id.to_string(),
                format!(
                    "Driver {} assigned to trip {}",
                    outcome.driver.as_ref().map_or("-", |d| d.name.as_str()),
                    trip.trip_number
                ),
            );
        }
        self.audit(
            "trip",
            trip_id,
            "trip.assignment_updated",
            None,
            json!({
                "driver_id": trip.driver_id,
                "truck_id": trip.truck_id,
                "trailer_id": trip.trailer_id,
                "share_driver_with_companies": trip.share_driver_with_companies,
                "adopted_default_equipment": outcome.adopted_default_equipment,
            }),
        );

        if outcome.driver_assigned || outcome.driver_cleared {
            self.refresh_financials(trip_id);
            return self.get_trip(owner, trip_id);
        }
        Ok(trip)
    }

    /// Record dates and odometer readings, then recompute.
    ///
    /// Changing a reading on a completed trip re-derives its mileage from the
    /// new readings, which must still run forward.
    pub fn update_trip_details(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        details: TripDetailsUpdate,
    ) -> DispatchResult<Trip> {
        details.validate()?;
        self.ledger
            .trips
            .try_update_owned(&trip_id, owner, |trip| {
                ensure_trip_open(trip)?;
                let start_date = details.start_date.or(trip.start_date);
                let end_date = details.end_date.or(trip.end_date);
                check_dates(start_date, end_date)?;
                let odometer_changed =
                    details.odometer_start.is_some() || details.odometer_end.is_some();
                let derived_miles = match (
                    details.odometer_start.or(trip.odometer.start),
                    details.odometer_end.or(trip.odometer.end),
                ) {
                    (Some(start), Some(end)) if odometer_changed && end <= start => {
                        return Err(TripError::NonPositiveMileage { start, end }.into());
                    }
                    (Some(start), Some(end)) if trip.status == TripStatus::Completed => {
                        Some(end - start)
                    }
                    _ => None,
                };

                trip.start_date = start_date;
                trip.end_date = end_date;
                if let Some(start) = details.odometer_start {
                    trip.odometer.start = Some(start);
                }
                if let Some(photo) = details.odometer_start_photo {
                    trip.odometer.start_photo_url = Some(photo);
                }
                if let Some(end) = details.odometer_end {
                    trip.odometer.end = Some(end);
                }
                if let Some(photo) = details.odometer_end_photo {
                    trip.odometer.end_photo_url = Some(photo);
                }
                if let Some(miles) = derived_miles.filter(|_| odometer_changed) {
                    trip.actual_miles = Some(miles);
                    trip.total_miles = Some(miles);
                }
                if let Some(miles) = details.total_miles {
                    trip.total_miles = Some(miles);
                }
                Ok::<_, DispatchError>(())
            })
            .ok_or(DispatchError::not_found("trip"))??;

        self.audit("trip", trip_id, "trip.details_updated", None, json!({}));
        self.refresh_financials(trip_id);
        self.get_trip(owner, trip_id)
    }

    /// PLANNED → ACTIVE, after the compliance gate.
    pub fn activate_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        evidence: OdometerStartEvidence,
        mode: Option<GateMode>,
    ) -> DispatchResult<GatedTrip> {
        let current = self.get_trip(owner, trip_id)?;
        let compliance = self.gate_trip(&current, "trip.activate", mode)?;
        let actor = evidence.actor.clone();
        let trip = self.transition_trip(owner, trip_id, "trip.activated", actor, |trip, _| {
            trip.activate(evidence)
        })?;
        Ok(GatedTrip { trip, compliance })
    }

    /// ACTIVE → EN_ROUTE, after the compliance gate.
    pub fn depart_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        actor: Option<String>,
        mode: Option<GateMode>,
    ) -> DispatchResult<GatedTrip> {
        let current = self.get_trip(owner, trip_id)?;
        let compliance = self.gate_trip(&current, "trip.depart", mode)?;
        let trip = self.transition_trip(owner, trip_id, "trip.departed", actor.clone(), |trip, _| {
            trip.depart(actor)
        })?;
        Ok(GatedTrip { trip, compliance })
    }

    pub fn complete_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        evidence: CloseEvidence,
    ) -> DispatchResult<Trip> {
        let actor = evidence.actor.clone();
        self.transition_trip(owner, trip_id, "trip.completed", actor, |trip, loads| {
            trip.complete(evidence, loads)
        })
    }

    pub fn settle_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        evidence: CloseEvidence,
    ) -> DispatchResult<Trip> {
        let actor = evidence.actor.clone();
        self.transition_trip(owner, trip_id, "trip.settled", actor, |trip, loads| {
            trip.settle(evidence, loads)
        })
    }

    pub fn cancel_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        reason: Option<String>,
        actor: Option<String>,
    ) -> DispatchResult<Trip> {
        self.transition_trip(owner, trip_id, "trip.cancelled", actor.clone(), |trip, _| {
            trip.cancel(reason, actor)
        })
    }

    /// Run a trip transition and recompute totals in the same write.
    ///
    /// The roster read lock is held until the trip is written, so the loads
    /// the transition checks are the loads the trip closes with.
    fn transition_trip(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        action: &'static str,
        actor: Option<String>,
        f: impl FnOnce(&mut Trip, &[Load]) -> Result<(), TripError>,
    ) -> DispatchResult<Trip> {
        let roster = self.ledger.roster.read();
        let loads = self.loads_for_links(&roster.loads_for_trip(trip_id));
        let expenses = self.trip_expenses(trip_id);
        let (from, trip) = self
            .ledger
            .trips
            .try_update_owned(&trip_id, owner, |trip| {
                let from = trip.status;
                f(trip, &loads)?;
                recompute(trip, &loads, &expenses);
                Ok::<_, TripError>((from, trip.clone()))
            })
            .ok_or(DispatchError::not_found("trip"))??;
        drop(roster);

        tracing::info!(%trip_id, %from, to = %trip.status, action, "trip transition");
        self.audit(
            "trip",
            trip_id,
            action,
            actor,
            json!({
                "from": from,
                "to": trip.status,
                "actual_miles": trip.actual_miles,
                "revenue": trip.totals.revenue,
                "profit": trip.totals.profit,
            }),
        );
        self.effects.message(
            trip_id.to_string(),
            format!("Trip {} moved from {} to {}", trip.trip_number, from, trip.status),
        );
        Ok(trip)
    }

    fn gate_trip(
        &self,
        trip: &Trip,
        action: &str,
        mode: Option<GateMode>,
    ) -> Result<Vec<ComplianceItem>, ComplianceBlocked> {
        let today = Timestamp::now().date();
        let gate = mode.map(ComplianceGate::new).unwrap_or(self.gate);
        gate.check(action, self.trip_credentials(trip, today))
    }

    fn trip_credentials(&self, trip: &Trip, today: NaiveDate) -> Vec<ComplianceItem> {
        let directory = self.directory(trip.owner_id);
        let mut items = Vec::new();
        if let Some(driver) = trip.driver_id.and_then(|id| directory.driver(id)) {
            items.extend(evaluate_driver(&driver, today));
        }
        if let Some(truck) = trip.truck_id.and_then(|id| directory.truck(id)) {
            items.extend(evaluate_truck(&truck, today));
        }
        if let Some(trailer) = trip.trailer_id.and_then(|id| directory.trailer(id)) {
            items.extend(evaluate_trailer(&trailer, today));
        }
        items
    }

    // ── Roster ──────────────────────────────────────────────────────

    /// Attach a load to the end of the trip's delivery sequence. A load on
    /// another trip is moved.
    pub fn attach_load(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        load_id: LoadId,
        role: LoadRole,
    ) -> DispatchResult<TripLoad> {
        let trip = self.get_trip(owner, trip_id)?;
        ensure_roster_open(&trip)?;
        let load = self.get_load(owner, load_id)?;
        if load.status == LoadStatus::Cancelled {
            return Err(ValidationError::invalid("load_id", "cancelled loads cannot join a trip").into());
        }

        let (attached, already_on_trip) = {
            let mut roster = self.ledger.roster.write();
            // Statuses are re-read under the roster lock; transitions hold it too.
            let current = roster.trip_for_load(load_id);
            let affected = std::iter::once(trip_id).chain(current.filter(|id| *id != trip_id));
            for id in affected {
                if let Some(held) = self.ledger.trips.get(&id) {
                    ensure_roster_open(&held)?;
                }
            }
            (roster.attach(trip_id, load_id, role), current == Some(trip_id))
        };

        let source = self.assignment_source(&trip);
        self.ledger.loads.update_with(&load_id, |load| {
            apply_to_load(&source, load, Some(attached.link.delivery_order()))
        });

        if let Some(previous) = attached.previous_trip {
            self.sync_delivery_orders(previous);
            self.refresh_financials(previous);
            if let Some(previous_trip) = self.ledger.trips.get(&previous) {
                self.notify(
                    previous_trip.driver_id,
                    NotificationKind::LoadRemoved,
                    &previous_trip,
                    Some(load_id),
                    format!(
                        "Load {} was moved off trip {}",
                        load.load_number, previous_trip.trip_number
                    ),
                );
            }
        }
        self.refresh_financials(trip_id);

        if !already_on_trip {
            self.notify(
                trip.driver_id,
                NotificationKind::LoadAdded,
                &trip,
                Some(load_id),
                format!(
                    "Load {} added to trip {} as stop {}",
                    load.load_number,
                    trip.trip_number,
                    attached.link.delivery_order()
                ),
            );
        }
        self.audit(
            "trip",
            trip_id,
            "trip.load_attached",
            None,
            json!({
                "load_id": load_id,
                "role": attached.link.role,
                "sequence_index": attached.link.sequence_index,
                "previous_trip_id": attached.previous_trip,
            }),
        );
        Ok(attached.link)
    }

    /// Remove a load from the trip and clear its derived fields.
    pub fn detach_load(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        load_id: LoadId,
    ) -> DispatchResult<Load> {
        let trip = self.get_trip(owner, trip_id)?;
        ensure_roster_open(&trip)?;
        let removed = self.ledger.roster.write().detach(trip_id, load_id)?;
        let load = self
            .ledger
            .loads
            .update_with(&load_id, |load| {
                clear_from_load(load);
                load.clone()
            })
            .ok_or(DispatchError::not_found("load"))?;

        self.sync_delivery_orders(trip_id);
        self.refresh_financials(trip_id);
        self.notify(
            trip.driver_id,
            NotificationKind::LoadRemoved,
            &trip,
            Some(load_id),
            format!(
                "Load {} removed from trip {}",
                load.load_number, trip.trip_number
            ),
        );
        self.audit(
            "trip",
            trip_id,
            "trip.load_detached",
            None,
            json!({ "load_id": load_id, "role": removed.role }),
        );
        Ok(load)
    }

    /// Set the delivery sequence. `order` must list every attached load once.
    pub fn reorder_loads(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        order: &[LoadId],
    ) -> DispatchResult<Vec<TripLoad>> {
        let trip = self.get_trip(owner, trip_id)?;
        ensure_roster_open(&trip)?;
        let links = self.ledger.roster.write().reorder(trip_id, order)?;
        self.apply_delivery_orders(&links);

        self.notify(
            trip.driver_id,
            NotificationKind::DeliveryOrderChanged,
            &trip,
            None,
            format!("Delivery order changed on trip {}", trip.trip_number),
        );
        self.audit(
            "trip",
            trip_id,
            "trip.loads_reordered",
            None,
            json!({ "order": order }),
        );
        Ok(links)
    }

    /// The trip's loads in delivery order.
    pub fn trip_loads(&self, owner: OwnerId, trip_id: TripId) -> DispatchResult<Vec<Load>> {
        self.get_trip(owner, trip_id)?;
        Ok(self.attached_loads(trip_id))
    }

    pub fn trip_links(&self, owner: OwnerId, trip_id: TripId) -> DispatchResult<Vec<TripLoad>> {
        self.get_trip(owner, trip_id)?;
        Ok(self.ledger.roster.read().loads_for_trip(trip_id))
    }

    fn trip_for_load(&self, load_id: LoadId) -> Option<TripId> {
        self.ledger.roster.read().trip_for_load(load_id)
    }

    fn attached_loads(&self, trip_id: TripId) -> Vec<Load> {
        let links = self.ledger.roster.read().loads_for_trip(trip_id);
        self.loads_for_links(&links)
    }

    fn loads_for_links(&self, links: &[TripLoad]) -> Vec<Load> {
        links
            .iter()
            .filter_map(|link| self.ledger.loads.get(&link.load_id))
            .collect()
    }

    fn assignment_source(&self, trip: &Trip) -> AssignmentSource {
        let driver = trip
            .driver_id
            .and_then(|id| self.ledger.drivers.get_owned(&id, trip.owner_id));
        AssignmentSource::for_trip(trip, driver.as_ref())
    }

    /// Copy the trip's assignment onto every attached load. Returns how many
    /// loads were rewritten.
    fn propagate_assignment(&self, trip: &Trip, driver: Option<&Driver>) -> usize {
        let source = AssignmentSource::for_trip(trip, driver);
        let links = self.ledger.roster.read().loads_for_trip(trip.id);
        links
            .iter()
            .filter_map(|link| {
                self.ledger.loads.update_with(&link.load_id, |load| {
                    apply_to_load(&source, load, Some(link.delivery_order()))
                })
            })
            .count()
    }

    fn sync_delivery_orders(&self, trip_id: TripId) {
        let links = self.ledger.roster.read().loads_for_trip(trip_id);
        self.apply_delivery_orders(&links);
    }

    fn apply_delivery_orders(&self, links: &[TripLoad]) {
        for link in links {
            self.ledger.loads.update_with(&link.load_id, |load| {
                load.assignment.delivery_order = Some(link.delivery_order());
            });
        }
    }

    // ── Expenses ────────────────────────────────────────────────────

    pub fn add_expense(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        new: NewExpense,
    ) -> DispatchResult<TripExpense> {
        let trip = self.get_trip(owner, trip_id)?;
        let expense = TripExpense::record(&trip, new)?;
        self.ledger.expenses.insert(expense.id, expense.clone());

        self.audit(
            "trip",
            trip_id,
            "trip.expense_added",
            None,
            json!({
                "expense_id": expense.id,
                "category": expense.category,
                "amount": expense.amount,
                "paid_by": expense.paid_by,
            }),
        );
        self.refresh_financials(trip_id);
        Ok(expense)
    }

    pub fn remove_expense(
        &self,
        owner: OwnerId,
        expense_id: ExpenseId,
    ) -> DispatchResult<TripExpense> {
        let expense = self
            .ledger
            .expenses
            .get_owned(&expense_id, owner)
            .ok_or(DispatchError::not_found("expense"))?;
        let trip = self.get_trip(owner, expense.trip_id)?;
        ensure_open(&trip)?;
        self.ledger.expenses.remove(&expense_id);

        self.audit(
            "trip",
            trip.id,
            "trip.expense_removed",
            None,
            json!({ "expense_id": expense_id, "amount": expense.amount }),
        );
        self.refresh_financials(trip.id);
        Ok(expense)
    }

    pub fn list_expenses(
        &self,
        owner: OwnerId,
        trip_id: TripId,
    ) -> DispatchResult<Vec<TripExpense>> {
        self.get_trip(owner, trip_id)?;
        Ok(self.trip_expenses(trip_id))
    }

    fn trip_expenses(&self, trip_id: TripId) -> Vec<TripExpense> {
        let mut expenses = self.ledger.expenses.filter(|e| e.trip_id == trip_id);
        expenses.sort_by_key(|e| e.created_at);
        expenses
    }

    // ── Financials ──────────────────────────────────────────────────

    /// Recompute and store the trip's totals.
    pub fn recompute_trip(&self, owner: OwnerId, trip_id: TripId) -> DispatchResult<TripFinancials> {
        self.get_trip(owner, trip_id)?;
        self.refresh_financials(trip_id)
            .ok_or(DispatchError::not_found("trip"))
    }

    pub fn settlement_preview(
        &self,
        owner: OwnerId,
        trip_id: TripId,
    ) -> DispatchResult<SettlementPreview> {
        let trip = self.get_trip(owner, trip_id)?;
        let loads = self.attached_loads(trip_id);
        let expenses = self.trip_expenses(trip_id);
        let financials = compute_trip_financials(&trip, &loads, &expenses);
        Ok(settlement_preview(trip_id, &financials, &loads, &expenses))
    }

    /// Recompute and store totals. Settled and cancelled trips keep the
    /// totals written by their closing transition.
    fn refresh_financials(&self, trip_id: TripId) -> Option<TripFinancials> {
        let loads = self.attached_loads(trip_id);
        let expenses = self.trip_expenses(trip_id);
        let financials = self.ledger.trips.update_with(&trip_id, |trip| {
            if trip.status.is_terminal() {
                compute_trip_financials(trip, &loads, &expenses)
            } else {
                recompute(trip, &loads, &expenses)
            }
        })?;
        tracing::debug!(
            %trip_id,
            revenue = %financials.revenue,
            driver_pay = %financials.total_driver_pay,
            profit = %financials.profit,
            "trip financials recomputed"
        );
        Some(financials)
    }

    // ── Fleet records ───────────────────────────────────────────────

    pub fn upsert_driver(&self, owner: OwnerId, mut driver: Driver) -> DispatchResult<Driver> {
        require_text(Some(&driver.name), "name")?;
        claim(&self.ledger.drivers, &driver.id, owner, "driver")?;
        driver.owner_id = owner;
        self.ledger.drivers.insert(driver.id, driver.clone());
        self.audit("driver", driver.id, "driver.upserted", None, json!({ "name": driver.name }));
        Ok(driver)
    }

    pub fn get_driver(&self, owner: OwnerId, driver_id: DriverId) -> DispatchResult<Driver> {
        self.ledger
            .drivers
            .get_owned(&driver_id, owner)
            .ok_or(DispatchError::not_found("driver"))
    }

    pub fn list_drivers(&self, owner: OwnerId) -> Vec<Driver> {
        let mut drivers = self.ledger.drivers.list_owned(owner);
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        drivers
    }

    pub fn upsert_truck(&self, owner: OwnerId, mut truck: Truck) -> DispatchResult<Truck> {
        require_text(Some(&truck.unit_number), "unit_number")?;
        claim(&self.ledger.trucks, &truck.id, owner, "truck")?;
        truck.owner_id = owner;
        self.ledger.trucks.insert(truck.id, truck.clone());
        self.audit(
            "truck",
            truck.id,
            "truck.upserted",
            None,
            json!({ "unit_number": truck.unit_number, "vehicle_type": truck.vehicle_type }),
        );
        Ok(truck)
    }

    pub fn get_truck(&self, owner: OwnerId, truck_id: TruckId) -> DispatchResult<Truck> {
        self.ledger
            .trucks
            .get_owned(&truck_id, owner)
            .ok_or(DispatchError::not_found("truck"))
    }

    pub fn list_trucks(&self, owner: OwnerId) -> Vec<Truck> {
        let mut trucks = self.ledger.trucks.list_owned(owner);
        trucks.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
        trucks
    }

    pub fn upsert_trailer(&self, owner: OwnerId, mut trailer: Trailer) -> DispatchResult<Trailer> {
        require_text(Some(&trailer.unit_number), "unit_number")?;
        claim(&self.ledger.trailers, &trailer.id, owner, "trailer")?;
        trailer.owner_id = owner;
        self.ledger.trailers.insert(trailer.id, trailer.clone());
        self.audit(
            "trailer",
            trailer.id,
            "trailer.upserted",
            None,
            json!({ "unit_number": trailer.unit_number }),
        );
        Ok(trailer)
    }

    pub fn get_trailer(&self, owner: OwnerId, trailer_id: TrailerId) -> DispatchResult<Trailer> {
        self.ledger
            .trailers
            .get_owned(&trailer_id, owner)
            .ok_or(DispatchError::not_found("trailer"))
    }

    pub fn list_trailers(&self, owner: OwnerId) -> Vec<Trailer> {
        let mut trailers = self.ledger.trailers.list_owned(owner);
        trailers.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
        trailers
    }

    pub fn add_partnership_document(
        &self,
        owner: OwnerId,
        document: PartnershipDocument,
    ) -> DispatchResult<PartnerDocumentRecord> {
        require_text(Some(&document.company_name), "company_name")?;
        require_text(Some(&document.document_name), "document_name")?;
        let record = PartnerDocumentRecord {
            id: Uuid::new_v4(),
            owner_id: owner,
            document,
        };
        self.ledger
            .partner_documents
            .insert(record.id, record.clone());
        self.audit(
            "partnership_document",
            record.id,
            "partnership_document.added",
            None,
            json!({
                "company_id": record.document.company_id,
                "document_name": record.document.document_name,
            }),
        );
        Ok(record)
    }

    pub fn list_partnership_documents(&self, owner: OwnerId) -> Vec<PartnerDocumentRecord> {
        let mut documents = self.ledger.partner_documents.list_owned(owner);
        documents.sort_by(|a, b| {
            (&a.document.company_name, &a.document.document_name)
                .cmp(&(&b.document.company_name, &b.document.document_name))
        });
        documents
    }

    // ── Compliance ──────────────────────────────────────────────────

    pub fn driver_compliance(
        &self,
        owner: OwnerId,
        driver_id: DriverId,
        today: NaiveDate,
    ) -> DispatchResult<ComplianceReport> {
        let driver = self.get_driver(owner, driver_id)?;
        Ok(ComplianceReport::new(today, evaluate_driver(&driver, today)))
    }

    pub fn truck_compliance(
        &self,
        owner: OwnerId,
        truck_id: TruckId,
        today: NaiveDate,
    ) -> DispatchResult<ComplianceReport> {
        let truck = self.get_truck(owner, truck_id)?;
        Ok(ComplianceReport::new(today, evaluate_truck(&truck, today)))
    }

    pub fn trailer_compliance(
        &self,
        owner: OwnerId,
        trailer_id: TrailerId,
        today: NaiveDate,
    ) -> DispatchResult<ComplianceReport> {
        let trailer = self.get_trailer(owner, trailer_id)?;
        Ok(ComplianceReport::new(today, evaluate_trailer(&trailer, today)))
    }

    /// The credentials a trip's gate would look at.
    pub fn trip_compliance(
        &self,
        owner: OwnerId,
        trip_id: TripId,
        today: NaiveDate,
    ) -> DispatchResult<ComplianceReport> {
        let trip = self.get_trip(owner, trip_id)?;
        Ok(ComplianceReport::new(today, self.trip_credentials(&trip, today)))
    }

    /// Every driver, truck, trailer, and partnership document the owner has.
    pub fn fleet_compliance(&self, owner: OwnerId, today: NaiveDate) -> ComplianceReport {
        let mut items = Vec::new();
        for driver in self.ledger.drivers.list_owned(owner) {
            items.extend(evaluate_driver(&driver, today));
        }
        for truck in self.ledger.trucks.list_owned(owner) {
            items.extend(evaluate_truck(&truck, today));
        }
        for trailer in self.ledger.trailers.list_owned(owner) {
            items.extend(evaluate_trailer(&trailer, today));
        }
        for record in self.ledger.partner_documents.list_owned(owner) {
            items.extend(evaluate_partnership_document(&record.document, today));
        }
        ComplianceReport::new(today, items)
    }

    // ── Gauges ──────────────────────────────────────────────────────

    /// Loads per status across all owners.
    pub fn load_status_counts(&self) -> Vec<(LoadStatus, usize)> {
        let loads = self.ledger.loads.list();
        LoadStatus::ALL
            .iter()
            .map(|status| (*status, loads.iter().filter(|l| l.status == *status).count()))
            .collect()
    }

    /// Trips per status across all owners.
    pub fn trip_status_counts(&self) -> Vec<(TripStatus, usize)> {
        let trips = self.ledger.trips.list();
        TripStatus::ALL
            .iter()
            .map(|status| (*status, trips.iter().filter(|t| t.status == *status).count()))
            .collect()
    }

    // ── Side effects ────────────────────────────────────────────────

    fn audit(
        &self,
        entity_kind: &str,
        entity_id: impl ToString,
        action: &str,
        performed_by: Option<String>,
        metadata: serde_json::Value,
    ) {
        self.effects.audit(AuditEvent {
            entity_kind: entity_kind.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            performed_by,
            metadata,
        });
    }

    fn notify(
        &self,
        recipient: Option<DriverId>,
        kind: NotificationKind,
        trip: &Trip,
        load_id: Option<LoadId>,
        message: String,
    ) {
        if let Some(recipient) = recipient {
            self.effects.notify(Notification {
                recipient,
                kind,
                trip_id: Some(trip.id),
                load_id,
                message,
            });
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn ensure_trip_open(trip: &Trip) -> Result<(), TripError> {
    if trip.status.is_terminal() {
        return Err(TripError::StateMismatch {
            trip_id: trip.id,
            current: trip.status,
            expected: OPEN_TRIP_STATES.to_vec(),
        });
    }
    Ok(())
}

fn ensure_roster_open(trip: &Trip) -> Result<(), TripError> {
    if !ROSTER_OPEN_STATES.contains(&trip.status) {
        return Err(TripError::StateMismatch {
            trip_id: trip.id,
            current: trip.status,
            expected: ROSTER_OPEN_STATES.to_vec(),
        });
    }
    Ok(())
}

/// Reject an id already held by another owner.
fn claim<K, T>(store: &Store<K, T>, id: &K, owner: OwnerId, kind: &'static str) -> DispatchResult<()>
where
    K: Copy + Eq + std::hash::Hash,
    T: Clone + Owned,
{
    match store.get(id) {
        Some(existing) if existing.owner_id() != owner => Err(DispatchError::not_found(kind)),
        _ => Ok(()),
    }
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::invalid(
            "end_date",
            format!("{end} is before start date {start}"),
        )),
        _ => Ok(()),
    }
}

fn non_negative(field: &'static str, value: Option<Decimal>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(ValidationError::invalid(field, "must not be negative")),
        _ => Ok(()),
    }
}

/// Non-negative and no larger than [`haul_core::MAX_AMOUNT`].
fn bounded(field: &'static str, value: Option<Decimal>) -> Result<(), ValidationError> {
    non_negative(field, value)?;
    value.map_or(Ok(()), |v| check_limit(field, v))
}

fn validate_pricing(pricing: LoadPricing) -> Result<LoadPricing, ValidationError> {
    bounded("contract_rate", Some(pricing.contract_rate))?;
    if pricing.accessorials.iter().any(|c| c.amount < Decimal::ZERO) {
        return Err(ValidationError::invalid(
            "accessorials",
            "amounts must not be negative",
        ));
    }
    for charge in &pricing.accessorials {
        check_limit("accessorials", charge.amount)?;
    }
    Ok(LoadPricing {
        contract_rate: round_cents(pricing.contract_rate),
        accessorials: pricing
            .accessorials
            .into_iter()
            .map(|charge| AccessorialCharge {
                amount: round_cents(charge.amount),
                ..charge
            })
            .collect(),
    })
}
