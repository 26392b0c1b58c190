//! # Trip API
//!
//! Trip planning and lifecycle (`planned → active → en_route → completed →
//! settled`), the load roster, expenses, and settlement figures.
//!
//! Activation and departure pass through the compliance gate. The request
//! may name a gate mode; otherwise the server's configured mode applies.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use uuid::Uuid;

use haul_compliance::GateMode;
use haul_core::{DriverId, ExpenseId, LoadId, TrailerId, TripId, TruckId};
use haul_dispatch::{GatedTrip, NewTrip, TripDetailsUpdate};
use haul_fleet::{AssignmentUpdate, LoadRole, TripLoad};
use haul_settlement::{ExpenseCategory, NewExpense, PaidBy, SettlementPreview, TripExpense, TripFinancials};
use haul_state::{CloseEvidence, Load, OdometerStartEvidence, Trip, TripStatus};

use crate::error::AppError;
use crate::extractors::{extract_json, OwnerContext};
use crate::state::AppState;

// ── Requests ────────────────────────────────────────────────────────

/// Request to plan a trip.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTripRequest {
    pub trip_number: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub truck_id: Option<Uuid>,
    #[serde(default)]
    pub trailer_id: Option<Uuid>,
    #[serde(default)]
    pub share_driver_with_companies: Option<bool>,
}

/// Driver and equipment patch.
///
/// An absent field is left alone, `null` clears the assignment, and an ID
/// sets it.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AssignmentRequest {
    #[serde(default, deserialize_with = "patch")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub driver_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "patch")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub truck_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "patch")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub trailer_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub share_driver_with_companies: Option<bool>,
}

fn patch<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

impl From<AssignmentRequest> for AssignmentUpdate {
    fn from(req: AssignmentRequest) -> Self {
        Self {
            driver_id: req.driver_id.map(|id| id.map(DriverId::from_uuid)),
            truck_id: req.truck_id.map(|id| id.map(TruckId::from_uuid)),
            trailer_id: req.trailer_id.map(|id| id.map(TrailerId::from_uuid)),
            share_driver_with_companies: req.share_driver_with_companies,
        }
    }
}

/// Dates and odometer readings. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TripDetailsRequest {
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

impl From<TripDetailsRequest> for TripDetailsUpdate {
    fn from(req: TripDetailsRequest) -> Self {
        Self {
            start_date: req.start_date,
            end_date: req.end_date,
            odometer_start: req.odometer_start,
            odometer_start_photo: req.odometer_start_photo,
            odometer_end: req.odometer_end,
            odometer_end_photo: req.odometer_end_photo,
            total_miles: req.total_miles,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ActivateTripRequest {
    #[serde(default)]
    pub odometer_start: Option<Decimal>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    /// `advisory` or `blocking`; defaults to the server setting.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub mode: Option<GateMode>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DepartTripRequest {
    #[serde(default)]
    pub actor: Option<String>,
    /// `advisory` or `blocking`; defaults to the server setting.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub mode: Option<GateMode>,
}

/// Odometer-end evidence for completion and settlement.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CloseTripRequest {
    #[serde(default)]
    pub odometer_end: Option<Decimal>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl From<CloseTripRequest> for CloseEvidence {
    fn from(req: CloseTripRequest) -> Self {
        Self {
            odometer_end: req.odometer_end,
            photo_url: req.photo_url,
            actor: req.actor,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelTripRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachLoadRequest {
    pub load_id: Uuid,
    /// `primary` (default), `backhaul`, or `partial`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub role: LoadRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderLoadsRequest {
    /// Every attached load, in the new order.
    pub load_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddExpenseRequest {
    /// `fuel`, `tolls`, `driver_pay`, `lumper`, `parking`, `maintenance`, or `other`.
    #[schema(value_type = Option<String>)]
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Decimal>,
    /// `driver_personal`, `company_card`, `fuel_card`, or `company_account`.
    #[schema(value_type = Option<String>)]
    pub paid_by: Option<PaidBy>,
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub incurred_on: Option<NaiveDate>,
}

impl From<AddExpenseRequest> for NewExpense {
    fn from(req: AddExpenseRequest) -> Self {
        Self {
            category: req.category,
            amount: req.amount,
            paid_by: req.paid_by,
            receipt_url: req.receipt_url,
            description: req.description,
            incurred_on: req.incurred_on,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TripFilter {
    pub status: Option<TripStatus>,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", get(list_trips).post(create_trip))
        .route("/v1/trips/:id", get(get_trip))
        .route("/v1/trips/:id/assignment", put(update_assignment))
        .route("/v1/trips/:id/details", put(update_details))
        .route("/v1/trips/:id/activate", post(activate_trip))
        .route("/v1/trips/:id/depart", post(depart_trip))
        .route("/v1/trips/:id/complete", post(complete_trip))
        .route("/v1/trips/:id/settle", post(settle_trip))
        .route("/v1/trips/:id/cancel", post(cancel_trip))
        .route("/v1/trips/:id/loads", get(trip_loads).post(attach_load))
        .route("/v1/trips/:id/reorder", put(reorder_loads))
        .route("/v1/trips/:id/loads/:load_id", delete(detach_load))
        .route("/v1/trips/:id/links", get(trip_links))
        .route("/v1/trips/:id/expenses", get(list_expenses).post(add_expense))
        .route("/v1/expenses/:id", delete(remove_expense))
        .route("/v1/trips/:id/recompute", post(recompute_trip))
        .route("/v1/trips/:id/settlement-preview", get(settlement_preview))
}

// ── Trips ───────────────────────────────────────────────────────────

/// POST /v1/trips: Plan a trip.
///
/// An assigned driver brings default equipment and compensation terms.
#[utoipa::path(
    post,
    path = "/v1/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 201, description = "Trip planned"),
        (status = 404, description = "Driver or equipment not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error or incompatible equipment", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn create_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let req = extract_json(body)?;
    let trip = state.dispatcher.create_trip(
        owner,
        NewTrip {
            trip_number: req.trip_number,
            start_date: req.start_date,
            end_date: req.end_date,
            assignment: AssignmentUpdate {
                driver_id: req.driver_id.map(|id| Some(DriverId::from_uuid(id))),
                truck_id: req.truck_id.map(|id| Some(TruckId::from_uuid(id))),
                trailer_id: req.trailer_id.map(|id| Some(TrailerId::from_uuid(id))),
                share_driver_with_companies: req.share_driver_with_companies,
            },
        },
    )?;
    state.persist_trip(trip.id).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

/// GET /v1/trips: List the owner's trips.
#[utoipa::path(
    get,
    path = "/v1/trips",
    params(("status" = Option<String>, Query, description = "Only trips in this status")),
    responses((status = 200, description = "Trips, oldest first")),
    tag = "trips"
)]
pub(crate) async fn list_trips(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Query(filter): Query<TripFilter>,
) -> Json<Vec<Trip>> {
    Json(state.dispatcher.list_trips(owner, filter.status))
}

/// GET /v1/trips/:id: Fetch one trip.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn get_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.dispatcher.get_trip(owner, TripId::from_uuid(id))?))
}

/// PUT /v1/trips/:id/assignment: Change driver and equipment.
#[utoipa::path(
    put,
    path = "/v1/trips/{id}/assignment",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = AssignmentRequest,
    responses(
        (status = 200, description = "Assignment updated and pushed to attached loads"),
        (status = 404, description = "Trip, driver, or equipment not found", body = crate::error::ErrorBody),
        (status = 422, description = "Incompatible equipment", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn update_assignment(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<AssignmentRequest>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let req = extract_json(body)?;
    let trip = state
        .dispatcher
        .update_trip_assignment(owner, TripId::from_uuid(id), req.into())?;
    state.persist_trip(trip.id).await?;
    Ok(Json(trip))
}

/// PUT /v1/trips/:id/details: Record dates and odometer readings.
#[utoipa::path(
    put,
    path = "/v1/trips/{id}/details",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = TripDetailsRequest,
    responses(
        (status = 200, description = "Trip updated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn update_details(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<TripDetailsRequest>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let req = extract_json(body)?;
    let trip = state
        .dispatcher
        .update_trip_details(owner, TripId::from_uuid(id), req.into())?;
    state.persist_trip(trip.id).await?;
    Ok(Json(trip))
}

/// POST /v1/trips/:id/activate: planned → active.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/activate",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = ActivateTripRequest,
    responses(
        (status = 200, description = "Trip active; advisory compliance items attached"),
        (status = 409, description = "Not planned, or blocked by expired credentials", body = crate::error::ErrorBody),
        (status = 422, description = "Missing odometer evidence", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn activate_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<ActivateTripRequest>, JsonRejection>,
) -> Result<Json<GatedTrip>, AppError> {
    let req = extract_json(body)?;
    let evidence = OdometerStartEvidence {
        odometer_start: req.odometer_start,
        photo_url: req.photo_url,
        actor: req.actor,
    };
    let gated = state
        .dispatcher
        .activate_trip(owner, TripId::from_uuid(id), evidence, req.mode)?;
    state.persist_trip(gated.trip.id).await?;
    Ok(Json(gated))
}

/// POST /v1/trips/:id/depart: active → en_route.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/depart",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = DepartTripRequest,
    responses(
        (status = 200, description = "Trip en route"),
        (status = 409, description = "Not active, or blocked by expired credentials", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn depart_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<DepartTripRequest>, JsonRejection>,
) -> Result<Json<GatedTrip>, AppError> {
    let req = extract_json(body)?;
    let gated = state
        .dispatcher
        .depart_trip(owner, TripId::from_uuid(id), req.actor, req.mode)?;
    state.persist_trip(gated.trip.id).await?;
    Ok(Json(gated))
}

/// POST /v1/trips/:id/complete: en_route → completed.
///
/// Refused while any attached load is short of delivery or storage.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/complete",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = CloseTripRequest,
    responses(
        (status = 200, description = "Trip completed; totals and driver pay computed"),
        (status = 409, description = "Not en route, or loads pending", body = crate::error::ErrorBody),
        (status = 422, description = "Missing or inconsistent odometer evidence", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn complete_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<CloseTripRequest>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let req = extract_json(body)?;
    let trip = state
        .dispatcher
        .complete_trip(owner, TripId::from_uuid(id), req.into())?;
    state.persist_trip(trip.id).await?;
    Ok(Json(trip))
}

/// POST /v1/trips/:id/settle: completed → settled.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/settle",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = CloseTripRequest,
    responses(
        (status = 200, description = "Trip settled"),
        (status = 409, description = "Not completed, or loads pending", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn settle_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<CloseTripRequest>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let req = extract_json(body)?;
    let trip = state
        .dispatcher
        .settle_trip(owner, TripId::from_uuid(id), req.into())?;
    state.persist_trip(trip.id).await?;
    Ok(Json(trip))
}

/// POST /v1/trips/:id/cancel: planned, active, or en_route → cancelled.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/cancel",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = CancelTripRequest,
    responses(
        (status = 200, description = "Trip cancelled"),
        (status = 409, description = "Trip already closed", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
pub(crate) async fn cancel_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<CancelTripRequest>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let req = extract_json(body)?;
    let trip = state
        .dispatcher
        .cancel_trip(owner, TripId::from_uuid(id), req.reason, req.actor)?;
    state.persist_trip(trip.id).await?;
    Ok(Json(trip))
}

// ── Roster ──────────────────────────────────────────────────────────

/// GET /v1/trips/:id/loads: Attached loads in roster order.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}/loads",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Attached loads"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "roster"
)]
pub(crate) async fn trip_loads(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Load>>, AppError> {
    Ok(Json(state.dispatcher.trip_loads(owner, TripId::from_uuid(id))?))
}

/// GET /v1/trips/:id/links: Roster links with sequence and role.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}/links",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Roster links"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "roster"
)]
pub(crate) async fn trip_links(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TripLoad>>, AppError> {
    Ok(Json(state.dispatcher.trip_links(owner, TripId::from_uuid(id))?))
}

/// POST /v1/trips/:id/loads: Attach a load.
///
/// A load already on another trip moves here.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/loads",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = AttachLoadRequest,
    responses(
        (status = 201, description = "Load attached"),
        (status = 404, description = "Trip or load not found", body = crate::error::ErrorBody),
        (status = 409, description = "Trip is closed", body = crate::error::ErrorBody),
    ),
    tag = "roster"
)]
pub(crate) async fn attach_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<AttachLoadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TripLoad>), AppError> {
    let req = extract_json(body)?;
    let trip_id = TripId::from_uuid(id);
    let load_id = LoadId::from_uuid(req.load_id);
    let previous = state.trip_for_load(load_id);
    let link = state
        .dispatcher
        .attach_load(owner, trip_id, load_id, req.role)?;
    state.persist_trip(trip_id).await?;
    if let Some(previous) = previous.filter(|p| *p != trip_id) {
        state.persist_trip(previous).await?;
    }
    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /v1/trips/:id/loads/:load_id: Detach a load.
#[utoipa::path(
    delete,
    path = "/v1/trips/{id}/loads/{load_id}",
    params(
        ("id" = Uuid, Path, description = "Trip ID"),
        ("load_id" = Uuid, Path, description = "Load ID"),
    ),
    responses(
        (status = 200, description = "Load detached; its assignment is cleared"),
        (status = 404, description = "Load not on this trip", body = crate::error::ErrorBody),
        (status = 409, description = "Trip is closed", body = crate::error::ErrorBody),
    ),
    tag = "roster"
)]
pub(crate) async fn detach_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path((id, load_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Load>, AppError> {
    let trip_id = TripId::from_uuid(id);
    let load = state
        .dispatcher
        .detach_load(owner, trip_id, LoadId::from_uuid(load_id))?;
    state.persist_detached(trip_id, load.id).await?;
    Ok(Json(load))
}

/// PUT /v1/trips/:id/reorder: Reorder the roster.
#[utoipa::path(
    put,
    path = "/v1/trips/{id}/reorder",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = ReorderLoadsRequest,
    responses(
        (status = 200, description = "Roster renumbered from zero"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
        (status = 422, description = "Order does not name exactly the attached loads", body = crate::error::ErrorBody),
    ),
    tag = "roster"
)]
pub(crate) async fn reorder_loads(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<ReorderLoadsRequest>, JsonRejection>,
) -> Result<Json<Vec<TripLoad>>, AppError> {
    let req = extract_json(body)?;
    let trip_id = TripId::from_uuid(id);
    let order: Vec<LoadId> = req.load_ids.into_iter().map(LoadId::from_uuid).collect();
    let links = state.dispatcher.reorder_loads(owner, trip_id, &order)?;
    state.persist_trip(trip_id).await?;
    Ok(Json(links))
}

// ── Expenses ────────────────────────────────────────────────────────

/// GET /v1/trips/:id/expenses: List a trip's expenses.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}/expenses",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Expenses"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "expenses"
)]
pub(crate) async fn list_expenses(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TripExpense>>, AppError> {
    Ok(Json(state.dispatcher.list_expenses(owner, TripId::from_uuid(id))?))
}

/// POST /v1/trips/:id/expenses: Record an expense with its receipt.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/expenses",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = AddExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded; trip totals recomputed"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
        (status = 409, description = "Trip is settled or cancelled", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "expenses"
)]
pub(crate) async fn add_expense(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<AddExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TripExpense>), AppError> {
    let req = extract_json(body)?;
    let expense = state
        .dispatcher
        .add_expense(owner, TripId::from_uuid(id), req.into())?;
    state.persist_expense(expense.id, expense.trip_id).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// DELETE /v1/expenses/:id: Remove an expense.
#[utoipa::path(
    delete,
    path = "/v1/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense removed; trip totals recomputed"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Trip is settled or cancelled", body = crate::error::ErrorBody),
    ),
    tag = "expenses"
)]
pub(crate) async fn remove_expense(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<TripExpense>, AppError> {
    let removed = state
        .dispatcher
        .remove_expense(owner, ExpenseId::from_uuid(id))?;
    state.persist_expense(removed.id, removed.trip_id).await?;
    Ok(Json(removed))
}

// ── Financials ──────────────────────────────────────────────────────

/// POST /v1/trips/:id/recompute: Recompute cached revenue and cost totals.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/recompute",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Fresh financial totals"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "settlement"
)]
pub(crate) async fn recompute_trip(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<TripFinancials>, AppError> {
    let trip_id = TripId::from_uuid(id);
    let financials = state.dispatcher.recompute_trip(owner, trip_id)?;
    state.persist_trip(trip_id).await?;
    Ok(Json(financials))
}

/// GET /v1/trips/:id/settlement-preview: Driver pay, reimbursements, and
/// collections, without changing the trip.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}/settlement-preview",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Settlement preview"),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "settlement"
)]
pub(crate) async fn settlement_preview(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementPreview>, AppError> {
    Ok(Json(
        state
            .dispatcher
            .settlement_preview(owner, TripId::from_uuid(id))?,
    ))
}
