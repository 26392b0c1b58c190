//! # Compliance API
//!
//! Expiration reports for drivers, equipment, trips, and the whole fleet.
//! Reports are evaluated against today's UTC date unless `as_of` names
//! another.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use haul_compliance::ComplianceReport;
use haul_core::{DriverId, Timestamp, TrailerId, TripId, TruckId};

use crate::error::AppError;
use crate::extractors::OwnerContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportDate {
    pub as_of: Option<NaiveDate>,
}

impl ReportDate {
    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Timestamp::now().date())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/compliance/fleet", get(fleet_report))
        .route("/v1/compliance/drivers/:id", get(driver_report))
        .route("/v1/compliance/trucks/:id", get(truck_report))
        .route("/v1/compliance/trailers/:id", get(trailer_report))
        .route("/v1/compliance/trips/:id", get(trip_report))
}

/// GET /v1/compliance/fleet: Every flagged credential and partnership
/// document the owner holds.
#[utoipa::path(
    get,
    path = "/v1/compliance/fleet",
    params(("as_of" = Option<String>, Query, description = "Evaluation date, YYYY-MM-DD")),
    responses((status = 200, description = "Fleet report, most severe first")),
    tag = "compliance"
)]
pub(crate) async fn fleet_report(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Query(date): Query<ReportDate>,
) -> Json<ComplianceReport> {
    Json(state.dispatcher.fleet_compliance(owner, date.today()))
}

#[utoipa::path(
    get,
    path = "/v1/compliance/drivers/{id}",
    params(
        ("id" = Uuid, Path, description = "Driver ID"),
        ("as_of" = Option<String>, Query, description = "Evaluation date, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "License and medical card status"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn driver_report(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    Query(date): Query<ReportDate>,
) -> Result<Json<ComplianceReport>, AppError> {
    Ok(Json(state.dispatcher.driver_compliance(
        owner,
        DriverId::from_uuid(id),
        date.today(),
    )?))
}

#[utoipa::path(
    get,
    path = "/v1/compliance/trucks/{id}",
    params(
        ("id" = Uuid, Path, description = "Truck ID"),
        ("as_of" = Option<String>, Query, description = "Evaluation date, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Registration and inspection status"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn truck_report(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    Query(date): Query<ReportDate>,
) -> Result<Json<ComplianceReport>, AppError> {
    Ok(Json(state.dispatcher.truck_compliance(
        owner,
        TruckId::from_uuid(id),
        date.today(),
    )?))
}

#[utoipa::path(
    get,
    path = "/v1/compliance/trailers/{id}",
    params(
        ("id" = Uuid, Path, description = "Trailer ID"),
        ("as_of" = Option<String>, Query, description = "Evaluation date, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Registration and inspection status"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn trailer_report(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    Query(date): Query<ReportDate>,
) -> Result<Json<ComplianceReport>, AppError> {
    Ok(Json(state.dispatcher.trailer_compliance(
        owner,
        TrailerId::from_uuid(id),
        date.today(),
    )?))
}

/// GET /v1/compliance/trips/:id: What the activation gate would see.
#[utoipa::path(
    get,
    path = "/v1/compliance/trips/{id}",
    params(
        ("id" = Uuid, Path, description = "Trip ID"),
        ("as_of" = Option<String>, Query, description = "Evaluation date, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Driver and equipment credentials on the trip"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn trip_report(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    Query(date): Query<ReportDate>,
) -> Result<Json<ComplianceReport>, AppError> {
    Ok(Json(state.dispatcher.trip_compliance(
        owner,
        TripId::from_uuid(id),
        date.today(),
    )?))
}
