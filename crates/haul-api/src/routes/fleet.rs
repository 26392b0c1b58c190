//! # Fleet API
//!
//! Drivers, trucks, trailers, and partnership documents. `POST` creates a
//! record with a fresh ID; `PUT /:id` replaces one in place.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use haul_compliance::PartnershipDocument;
use haul_core::{CompanyId, CompensationSnapshot, DriverId, TrailerId, TruckId};
use haul_dispatch::PartnerDocumentRecord;
use haul_fleet::{Driver, Trailer, Truck, VehicleType};

use crate::error::AppError;
use crate::extractors::{extract_json, OwnerContext};
use crate::state::AppState;

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DriverRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub default_truck_id: Option<Uuid>,
    #[serde(default)]
    pub default_trailer_id: Option<Uuid>,
    /// Current pay terms: `pay_mode` plus the rates it uses.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub compensation: Option<CompensationSnapshot>,
    #[serde(default)]
    pub license_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub medical_card_expiry: Option<NaiveDate>,
}

impl DriverRequest {
    fn into_driver(self, id: DriverId, owner: haul_core::OwnerId) -> Driver {
        Driver {
            id,
            owner_id: owner,
            name: self.name.unwrap_or_default(),
            phone: self.phone,
            default_truck_id: self.default_truck_id.map(TruckId::from_uuid),
            default_trailer_id: self.default_trailer_id.map(TrailerId::from_uuid),
            compensation: self.compensation,
            license_expiry: self.license_expiry,
            medical_card_expiry: self.medical_card_expiry,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TruckRequest {
    pub unit_number: Option<String>,
    /// `tractor`, `box_truck`, or `cargo_van`.
    #[schema(value_type = Option<String>)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub inspection_expiry: Option<NaiveDate>,
}

impl TruckRequest {
    fn into_truck(self, id: TruckId, owner: haul_core::OwnerId) -> Result<Truck, AppError> {
        let vehicle_type = self.vehicle_type.ok_or_else(|| AppError::Validation {
            message: "vehicle_type is required".to_string(),
            field: Some("vehicle_type"),
        })?;
        Ok(Truck {
            id,
            owner_id: owner,
            unit_number: self.unit_number.unwrap_or_default(),
            vehicle_type,
            registration_expiry: self.registration_expiry,
            inspection_expiry: self.inspection_expiry,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TrailerRequest {
    pub unit_number: Option<String>,
    #[serde(default)]
    pub registration_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub inspection_expiry: Option<NaiveDate>,
}

impl TrailerRequest {
    fn into_trailer(self, id: TrailerId, owner: haul_core::OwnerId) -> Trailer {
        Trailer {
            id,
            owner_id: owner,
            unit_number: self.unit_number.unwrap_or_default(),
            registration_expiry: self.registration_expiry,
            inspection_expiry: self.inspection_expiry,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PartnershipDocumentRequest {
    pub company_id: Uuid,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/drivers", get(list_drivers).post(create_driver))
        .route("/v1/drivers/:id", get(get_driver).put(put_driver))
        .route("/v1/trucks", get(list_trucks).post(create_truck))
        .route("/v1/trucks/:id", get(get_truck).put(put_truck))
        .route("/v1/trailers", get(list_trailers).post(create_trailer))
        .route("/v1/trailers/:id", get(get_trailer).put(put_trailer))
        .route(
            "/v1/partnership-documents",
            get(list_partnership_documents).post(add_partnership_document),
        )
}

// ── Drivers ─────────────────────────────────────────────────────────

/// POST /v1/drivers: Add a driver.
#[utoipa::path(
    post,
    path = "/v1/drivers",
    request_body = DriverRequest,
    responses(
        (status = 201, description = "Driver created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn create_driver(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<DriverRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let req = extract_json(body)?;
    let driver = state
        .dispatcher
        .upsert_driver(owner, req.into_driver(DriverId::new(), owner))?;
    state.persist_driver(&driver).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

/// PUT /v1/drivers/:id: Replace a driver record.
///
/// Trips keep the compensation snapshot they already captured.
#[utoipa::path(
    put,
    path = "/v1/drivers/{id}",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body = DriverRequest,
    responses(
        (status = 200, description = "Driver saved"),
        (status = 404, description = "Owned by another account", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn put_driver(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<DriverRequest>, JsonRejection>,
) -> Result<Json<Driver>, AppError> {
    let req = extract_json(body)?;
    let driver = state
        .dispatcher
        .upsert_driver(owner, req.into_driver(DriverId::from_uuid(id), owner))?;
    state.persist_driver(&driver).await?;
    Ok(Json(driver))
}

#[utoipa::path(
    get,
    path = "/v1/drivers",
    responses((status = 200, description = "Drivers by name")),
    tag = "fleet"
)]
pub(crate) async fn list_drivers(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
) -> Json<Vec<Driver>> {
    Json(state.dispatcher.list_drivers(owner))
}

#[utoipa::path(
    get,
    path = "/v1/drivers/{id}",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn get_driver(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.dispatcher.get_driver(owner, DriverId::from_uuid(id))?))
}

// ── Trucks ──────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/trucks",
    request_body = TruckRequest,
    responses(
        (status = 201, description = "Truck created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn create_truck(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<TruckRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Truck>), AppError> {
    let req = extract_json(body)?;
    let truck = state
        .dispatcher
        .upsert_truck(owner, req.into_truck(TruckId::new(), owner)?)?;
    state.persist_truck(&truck).await?;
    Ok((StatusCode::CREATED, Json(truck)))
}

#[utoipa::path(
    put,
    path = "/v1/trucks/{id}",
    params(("id" = Uuid, Path, description = "Truck ID")),
    request_body = TruckRequest,
    responses(
        (status = 200, description = "Truck saved"),
        (status = 404, description = "Owned by another account", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn put_truck(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<TruckRequest>, JsonRejection>,
) -> Result<Json<Truck>, AppError> {
    let req = extract_json(body)?;
    let truck = state
        .dispatcher
        .upsert_truck(owner, req.into_truck(TruckId::from_uuid(id), owner)?)?;
    state.persist_truck(&truck).await?;
    Ok(Json(truck))
}

#[utoipa::path(
    get,
    path = "/v1/trucks",
    responses((status = 200, description = "Trucks by unit number")),
    tag = "fleet"
)]
pub(crate) async fn list_trucks(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
) -> Json<Vec<Truck>> {
    Json(state.dispatcher.list_trucks(owner))
}

#[utoipa::path(
    get,
    path = "/v1/trucks/{id}",
    params(("id" = Uuid, Path, description = "Truck ID")),
    responses(
        (status = 200, description = "Truck found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn get_truck(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Truck>, AppError> {
    Ok(Json(state.dispatcher.get_truck(owner, TruckId::from_uuid(id))?))
}

// ── Trailers ────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/trailers",
    request_body = TrailerRequest,
    responses(
        (status = 201, description = "Trailer created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn create_trailer(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<TrailerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Trailer>), AppError> {
    let req = extract_json(body)?;
    let trailer = state
        .dispatcher
        .upsert_trailer(owner, req.into_trailer(TrailerId::new(), owner))?;
    state.persist_trailer(&trailer).await?;
    Ok((StatusCode::CREATED, Json(trailer)))
}

#[utoipa::path(
    put,
    path = "/v1/trailers/{id}",
    params(("id" = Uuid, Path, description = "Trailer ID")),
    request_body = TrailerRequest,
    responses(
        (status = 200, description = "Trailer saved"),
        (status = 404, description = "Owned by another account", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn put_trailer(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<TrailerRequest>, JsonRejection>,
) -> Result<Json<Trailer>, AppError> {
    let req = extract_json(body)?;
    let trailer = state
        .dispatcher
        .upsert_trailer(owner, req.into_trailer(TrailerId::from_uuid(id), owner))?;
    state.persist_trailer(&trailer).await?;
    Ok(Json(trailer))
}

#[utoipa::path(
    get,
    path = "/v1/trailers",
    responses((status = 200, description = "Trailers by unit number")),
    tag = "fleet"
)]
pub(crate) async fn list_trailers(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
) -> Json<Vec<Trailer>> {
    Json(state.dispatcher.list_trailers(owner))
}

#[utoipa::path(
    get,
    path = "/v1/trailers/{id}",
    params(("id" = Uuid, Path, description = "Trailer ID")),
    responses(
        (status = 200, description = "Trailer found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn get_trailer(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Trailer>, AppError> {
    Ok(Json(state.dispatcher.get_trailer(owner, TrailerId::from_uuid(id))?))
}

// ── Partnership documents ───────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/partnership-documents",
    request_body = PartnershipDocumentRequest,
    responses(
        (status = 201, description = "Document filed"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "fleet"
)]
pub(crate) async fn add_partnership_document(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<PartnershipDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PartnerDocumentRecord>), AppError> {
    let req = extract_json(body)?;
    let record = state.dispatcher.add_partnership_document(
        owner,
        PartnershipDocument {
            company_id: CompanyId::from_uuid(req.company_id),
            company_name: req.company_name,
            document_name: req.document_name,
            expires_on: req.expires_on,
        },
    )?;
    state.persist_partner_document(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/v1/partnership-documents",
    responses((status = 200, description = "Documents by company and name")),
    tag = "fleet"
)]
pub(crate) async fn list_partnership_documents(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
) -> Json<Vec<PartnerDocumentRecord>> {
    Json(state.dispatcher.list_partnership_documents(owner))
}
