//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Static bearer token. Set via the AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Haul API — Load & Trip Lifecycle",
        version = "0.1.0",
        description = "Load and trip lifecycle engine for owner-operator freight carriers.\n\nProvides:\n- **Loads**: evidence-gated transitions from pending to delivered or storage\n- **Trips**: driver and equipment assignment, odometer capture, completion and settlement\n- **Roster**: ordered trip↔load links with roles\n- **Expenses and settlement**: receipts, trip profit, driver pay previews\n- **Compliance**: credential expiration reports and the trip gate\n\nAuthentication: `Authorization: Bearer <token>` when AUTH_TOKEN is set. Every `/v1/*` request carries an `x-owner-id` header naming the owning account."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Loads ────────────────────────────────────────────────────────
        crate::routes::loads::create_load,
        crate::routes::loads::list_loads,
        crate::routes::loads::get_load,
        crate::routes::loads::load_view,
        crate::routes::loads::update_pricing,
        crate::routes::loads::accept_load,
        crate::routes::loads::start_loading,
        crate::routes::loads::finish_loading,
        crate::routes::loads::mark_pickup,
        crate::routes::loads::start_delivery,
        crate::routes::loads::complete_delivery,
        crate::routes::loads::storage_drop,
        crate::routes::loads::cancel_load,
        // ── Trips ────────────────────────────────────────────────────────
        crate::routes::trips::create_trip,
        crate::routes::trips::list_trips,
        crate::routes::trips::get_trip,
        crate::routes::trips::update_assignment,
        crate::routes::trips::update_details,
        crate::routes::trips::activate_trip,
        crate::routes::trips::depart_trip,
        crate::routes::trips::complete_trip,
        crate::routes::trips::settle_trip,
        crate::routes::trips::cancel_trip,
        // ── Roster ───────────────────────────────────────────────────────
        crate::routes::trips::trip_loads,
        crate::routes::trips::trip_links,
        crate::routes::trips::attach_load,
        crate::routes::trips::detach_load,
        crate::routes::trips::reorder_loads,
        // ── Expenses & settlement ────────────────────────────────────────
        crate::routes::trips::list_expenses,
        crate::routes::trips::add_expense,
        crate::routes::trips::remove_expense,
        crate::routes::trips::recompute_trip,
        crate::routes::trips::settlement_preview,
        // ── Fleet ────────────────────────────────────────────────────────
        crate::routes::fleet::create_driver,
        crate::routes::fleet::put_driver,
        crate::routes::fleet::list_drivers,
        crate::routes::fleet::get_driver,
        crate::routes::fleet::create_truck,
        crate::routes::fleet::put_truck,
        crate::routes::fleet::list_trucks,
        crate::routes::fleet::get_truck,
        crate::routes::fleet::create_trailer,
        crate::routes::fleet::put_trailer,
        crate::routes::fleet::list_trailers,
        crate::routes::fleet::get_trailer,
        crate::routes::fleet::add_partnership_document,
        crate::routes::fleet::list_partnership_documents,
        // ── Compliance ───────────────────────────────────────────────────
        crate::routes::compliance::fleet_report,
        crate::routes::compliance::driver_report,
        crate::routes::compliance::truck_report,
        crate::routes::compliance::trailer_report,
        crate::routes::compliance::trip_report,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::loads::CreateLoadRequest,
        crate::routes::loads::PricingRequest,
        crate::routes::loads::AccessorialInput,
        crate::routes::loads::ActorRequest,
        crate::routes::loads::StartLoadingRequest,
        crate::routes::loads::FinishLoadingRequest,
        crate::routes::loads::PickupRequest,
        crate::routes::loads::DeliveryRequest,
        crate::routes::loads::StorageDropRequest,
        crate::routes::loads::CancelRequest,
        crate::routes::trips::CreateTripRequest,
        crate::routes::trips::AssignmentRequest,
        crate::routes::trips::TripDetailsRequest,
        crate::routes::trips::ActivateTripRequest,
        crate::routes::trips::DepartTripRequest,
        crate::routes::trips::CloseTripRequest,
        crate::routes::trips::CancelTripRequest,
        crate::routes::trips::AttachLoadRequest,
        crate::routes::trips::ReorderLoadsRequest,
        crate::routes::trips::AddExpenseRequest,
        crate::routes::fleet::DriverRequest,
        crate::routes::fleet::TruckRequest,
        crate::routes::fleet::TrailerRequest,
        crate::routes::fleet::PartnershipDocumentRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "loads", description = "Load lifecycle and pricing"),
        (name = "trips", description = "Trip planning and lifecycle"),
        (name = "roster", description = "Loads attached to a trip"),
        (name = "expenses", description = "Trip expenses and receipts"),
        (name = "settlement", description = "Trip financials and driver settlement"),
        (name = "fleet", description = "Drivers, trucks, trailers, partner documents"),
        (name = "compliance", description = "Credential expiration reports"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
