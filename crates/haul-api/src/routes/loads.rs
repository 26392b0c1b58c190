//! # Load Lifecycle API
//!
//! Create, list, and price loads, and drive them through
//! `pending → accepted → loading → loaded → in_transit → delivered`, with
//! storage drop and cancellation as the alternate endings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use haul_core::{CompanyId, LoadId};
use haul_dispatch::NewLoad;
use haul_state::{
    AccessorialCharge, CancelEvidence, DeliveryEvidence, FinishLoadingEvidence, Load, LoadPricing,
    LoadStatus, LoadView, PaymentMethod, PickupEvidence, StartLoadingEvidence,
    StorageDropEvidence,
};

use crate::error::AppError;
use crate::extractors::{extract_json, OwnerContext};
use crate::state::AppState;

// ── Requests ────────────────────────────────────────────────────────

/// One accessorial charge line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessorialInput {
    pub description: String,
    pub amount: Decimal,
}

/// Contract rate and accessorial lines.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PricingRequest {
    #[serde(default)]
    pub contract_rate: Decimal,
    #[serde(default)]
    pub accessorials: Vec<AccessorialInput>,
}

impl From<PricingRequest> for LoadPricing {
    fn from(req: PricingRequest) -> Self {
        Self {
            contract_rate: req.contract_rate,
            accessorials: req
                .accessorials
                .into_iter()
                .map(|line| AccessorialCharge {
                    description: line.description,
                    amount: line.amount,
                })
                .collect(),
        }
    }
}

/// Request to create a pending load.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoadRequest {
    pub load_number: Option<String>,
    #[serde(default)]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, flatten)]
    pub pricing: PricingRequest,
}

/// Who performed a transition that needs no other evidence.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ActorRequest {
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartLoadingRequest {
    pub starting_cuft: Option<Decimal>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishLoadingRequest {
    pub ending_cuft: Option<Decimal>,
    pub photo_url: Option<String>,
    /// Replaces `ending_cuft − starting_cuft` when present.
    #[serde(default)]
    pub actual_cuft_override: Option<Decimal>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PickupRequest {
    pub actual_cuft_loaded: Option<Decimal>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryRequest {
    #[serde(default)]
    pub delivery_photos: Vec<String>,
    #[serde(default)]
    pub pod_photos: Vec<String>,
    #[serde(default)]
    pub collected_amount: Option<Decimal>,
    /// `cash`, `check`, `credit_card`, `ach`, or `other`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StorageDropRequest {
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Filter for the load list.
#[derive(Debug, Default, Deserialize)]
pub struct LoadFilter {
    pub status: Option<LoadStatus>,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/loads", get(list_loads).post(create_load))
        .route("/v1/loads/:id", get(get_load))
        .route("/v1/loads/:id/view", get(load_view))
        .route("/v1/loads/:id/pricing", put(update_pricing))
        .route("/v1/loads/:id/accept", post(accept_load))
        .route("/v1/loads/:id/start-loading", post(start_loading))
        .route("/v1/loads/:id/finish-loading", post(finish_loading))
        .route("/v1/loads/:id/pickup", post(mark_pickup))
        .route("/v1/loads/:id/start-delivery", post(start_delivery))
        .route("/v1/loads/:id/deliver", post(complete_delivery))
        .route("/v1/loads/:id/storage-drop", post(storage_drop))
        .route("/v1/loads/:id/cancel", post(cancel_load))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/loads: Create a pending load.
#[utoipa::path(
    post,
    path = "/v1/loads",
    request_body = CreateLoadRequest,
    responses(
        (status = 201, description = "Load created"),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn create_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    body: Result<Json<CreateLoadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Load>), AppError> {
    let req = extract_json(body)?;
    let load = state.dispatcher.create_load(
        owner,
        NewLoad {
            load_number: req.load_number,
            company_id: req.company_id.map(CompanyId::from_uuid),
            destination: req.destination,
            pricing: req.pricing.into(),
        },
    )?;
    state.persist_load(load.id).await?;
    Ok((StatusCode::CREATED, Json(load)))
}

/// GET /v1/loads: List the owner's loads.
#[utoipa::path(
    get,
    path = "/v1/loads",
    params(("status" = Option<String>, Query, description = "Only loads in this status")),
    responses((status = 200, description = "Loads, oldest first")),
    tag = "loads"
)]
pub(crate) async fn list_loads(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Query(filter): Query<LoadFilter>,
) -> Json<Vec<Load>> {
    Json(state.dispatcher.list_loads(owner, filter.status))
}

/// GET /v1/loads/:id: Fetch one load.
#[utoipa::path(
    get,
    path = "/v1/loads/{id}",
    params(("id" = Uuid, Path, description = "Load ID")),
    responses(
        (status = 200, description = "Load found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn get_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Load>, AppError> {
    Ok(Json(state.dispatcher.get_load(owner, LoadId::from_uuid(id))?))
}

/// GET /v1/loads/:id/view: The counterparty view of a load.
///
/// Driver name and phone are present only when the trip shares them.
#[utoipa::path(
    get,
    path = "/v1/loads/{id}/view",
    params(("id" = Uuid, Path, description = "Load ID")),
    responses(
        (status = 200, description = "Counterparty view"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn load_view(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<LoadView>, AppError> {
    Ok(Json(state.dispatcher.load_view(owner, LoadId::from_uuid(id))?))
}

/// PUT /v1/loads/:id/pricing: Replace contract rate and accessorials.
#[utoipa::path(
    put,
    path = "/v1/loads/{id}/pricing",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = PricingRequest,
    responses(
        (status = 200, description = "Pricing updated; the load's trip is recomputed"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Negative amount", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn update_pricing(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<PricingRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let load = state
        .dispatcher
        .update_load_pricing(owner, LoadId::from_uuid(id), req.into())?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/accept: pending → accepted.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/accept",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Load accepted"),
        (status = 409, description = "Load is not pending", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn accept_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let load = state
        .dispatcher
        .accept_load(owner, LoadId::from_uuid(id), req.actor)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/start-loading: accepted → loading.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/start-loading",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = StartLoadingRequest,
    responses(
        (status = 200, description = "Loading started"),
        (status = 409, description = "Load is not accepted", body = crate::error::ErrorBody),
        (status = 422, description = "Missing cubic feet or photo", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn start_loading(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<StartLoadingRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = StartLoadingEvidence {
        starting_cuft: req.starting_cuft,
        photo_url: req.photo_url,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .start_loading(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/finish-loading: loading → loaded.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/finish-loading",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = FinishLoadingRequest,
    responses(
        (status = 200, description = "Loading finished; actual volume recorded"),
        (status = 409, description = "Load is not loading", body = crate::error::ErrorBody),
        (status = 422, description = "Missing or inconsistent evidence", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn finish_loading(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<FinishLoadingRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = FinishLoadingEvidence {
        ending_cuft: req.ending_cuft,
        photo_url: req.photo_url,
        actual_cuft_override: req.actual_cuft_override,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .finish_loading(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/pickup: accepted or loading → loaded in one step.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/pickup",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = PickupRequest,
    responses(
        (status = 200, description = "Load picked up"),
        (status = 409, description = "Load cannot be picked up from its status", body = crate::error::ErrorBody),
        (status = 422, description = "Volume missing or not positive", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn mark_pickup(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<PickupRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = PickupEvidence {
        actual_cuft_loaded: req.actual_cuft_loaded,
        photo_urls: req.photo_urls,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .mark_pickup(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/start-delivery: loaded → in_transit.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/start-delivery",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Load in transit"),
        (status = 409, description = "Load is not loaded", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn start_delivery(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let load = state
        .dispatcher
        .start_delivery(owner, LoadId::from_uuid(id), req.actor)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/deliver: in_transit → delivered.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/deliver",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = DeliveryRequest,
    responses(
        (status = 200, description = "Load delivered"),
        (status = 409, description = "Load is not in transit", body = crate::error::ErrorBody),
        (status = 422, description = "Missing proof of delivery", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn complete_delivery(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<DeliveryRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = DeliveryEvidence {
        delivery_photos: req.delivery_photos,
        pod_photos: req.pod_photos,
        collected_amount: req.collected_amount,
        payment_method: req.payment_method,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .complete_delivery(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/storage-drop: in_transit → storage_completed.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/storage-drop",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = StorageDropRequest,
    responses(
        (status = 200, description = "Load dropped into storage"),
        (status = 409, description = "Load is not in transit", body = crate::error::ErrorBody),
        (status = 422, description = "Missing storage location", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn storage_drop(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<StorageDropRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = StorageDropEvidence {
        location_name: req.location_name,
        location_address: req.location_address,
        unit_number: req.unit_number,
        notes: req.notes,
        photo_urls: req.photo_urls,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .set_storage_drop(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}

/// POST /v1/loads/:id/cancel: pending or accepted → cancelled.
#[utoipa::path(
    post,
    path = "/v1/loads/{id}/cancel",
    params(("id" = Uuid, Path, description = "Load ID")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Load cancelled"),
        (status = 409, description = "Load is past acceptance", body = crate::error::ErrorBody),
        (status = 422, description = "Missing reason", body = crate::error::ErrorBody),
    ),
    tag = "loads"
)]
pub(crate) async fn cancel_load(
    State(state): State<AppState>,
    OwnerContext(owner): OwnerContext,
    Path(id): Path<Uuid>,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<Load>, AppError> {
    let req = extract_json(body)?;
    let evidence = CancelEvidence {
        reason: req.reason,
        actor: req.actor,
    };
    let load = state
        .dispatcher
        .cancel_load(owner, LoadId::from_uuid(id), evidence)?;
    state.persist_load(load.id).await?;
    Ok(Json(load))
}
