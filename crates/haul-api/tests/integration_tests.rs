//! # Integration Tests for haul-api
//!
//! Drives the assembled router over HTTP: health probes, authentication,
//! owner scoping, a full load and trip lifecycle through settlement, the
//! 409 error contracts, the compliance gate, and the OpenAPI document.

use std::str::FromStr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use haul_api::state::{AppConfig, AppState};

/// Helper: build the test app with auth disabled and no database.
fn test_app() -> axum::Router {
    haul_api::app(AppState::new())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    haul_api::app(AppState::with_config(config, None))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a JSON request as `owner` and decode the JSON reply.
async fn call(
    app: &axum::Router,
    method: &str,
    uri: &str,
    owner: Uuid,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-owner-id", owner.to_string());
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// Create a load and walk it to `loaded` via pickup.
async fn loaded_load(app: &axum::Router, owner: Uuid, number: &str, rate: &str) -> String {
    let (status, load) = call(
        app,
        "POST",
        "/v1/loads",
        owner,
        Some(json!({ "load_number": number, "destination": "Denver, CO", "contract_rate": rate })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let load_id = id(&load);

    let (status, _) = call(app, "POST", &format!("/v1/loads/{load_id}/accept"), owner, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, load) = call(
        app,
        "POST",
        &format!("/v1/loads/{load_id}/pickup"),
        owner,
        Some(json!({ "actual_cuft_loaded": "800", "photo_urls": ["https://photos/pickup.jpg"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(load["status"], "loaded");
    load_id
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_metrics_reports_status_gauges() {
    let app = test_app();
    let owner = Uuid::new_v4();
    loaded_load(&app, owner, "L-M1", "900").await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("haul_loads_total{status=\"loaded\"} 1"));
    assert!(body.contains("haul_trips_total{status=\"planned\"} 0"));
    assert!(body.contains("haul_http_requests_total"));
}

#[tokio::test]
async fn test_metrics_absent_when_disabled() {
    let config = AppConfig {
        metrics_enabled: false,
        ..AppConfig::default()
    };
    let app = haul_api::app(AppState::with_config(config, None));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Authentication & Owner Scoping -------------------------------------------

#[tokio::test]
async fn test_auth_rejects_missing_token() {
    let app = test_app_with_auth("secret");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/loads")
                .header("x-owner-id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_accepts_valid_token_and_health_stays_open() {
    let app = test_app_with_auth("secret");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/loads")
                .header("authorization", "Bearer secret")
                .header("x-owner-id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_owner_header_is_unauthorized() {
    let response = test_app()
        .oneshot(Request::builder().uri("/v1/trips").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_other_owner_sees_not_found() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let load_id = loaded_load(&app, owner, "L-OWN", "500").await;

    let stranger = Uuid::new_v4();
    let (status, body) = call(&app, "GET", &format!("/v1/loads/{load_id}"), stranger, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, list) = call(&app, "GET", "/v1/loads", stranger, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/loads")
        .header("x-owner-id", Uuid::new_v4().to_string())
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

// -- Full Lifecycle -----------------------------------------------------------

#[tokio::test]
async fn test_trip_lifecycle_through_settlement() {
    let app = test_app();
    let owner = Uuid::new_v4();

    let (status, driver) = call(
        &app,
        "POST",
        "/v1/drivers",
        owner,
        Some(json!({
            "name": "Dana Ruiz",
            "phone": "555-0100",
            "compensation": { "pay_mode": "per_mile", "rate_per_mile": "0.50" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, truck) = call(
        &app,
        "POST",
        "/v1/trucks",
        owner,
        Some(json!({ "unit_number": "T-12", "vehicle_type": "box_truck" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, trip) = call(
        &app,
        "POST",
        "/v1/trips",
        owner,
        Some(json!({
            "trip_number": "TR-100",
            "driver_id": id(&driver),
            "truck_id": id(&truck),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(trip["status"], "planned");
    assert_eq!(trip["compensation"]["pay_mode"], "per_mile");
    let trip_id = id(&trip);

    let load_id = loaded_load(&app, owner, "L-100", "2000").await;
    let (status, link) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/loads"),
        owner,
        Some(json!({ "load_id": load_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(link["sequence_index"], 0);
    assert_eq!(link["role"], "primary");

    let (status, gated) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/activate"),
        owner,
        Some(json!({ "odometer_start": "1000", "photo_url": "https://photos/odo-start.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gated["trip"]["status"], "active");

    let (status, gated) = call(&app, "POST", &format!("/v1/trips/{trip_id}/depart"), owner, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gated["trip"]["status"], "en_route");

    let (status, _) = call(&app, "POST", &format!("/v1/loads/{load_id}/start-delivery"), owner, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, load) = call(
        &app,
        "POST",
        &format!("/v1/loads/{load_id}/deliver"),
        owner,
        Some(json!({
            "pod_photos": ["https://photos/pod.jpg"],
            "collected_amount": "300",
            "payment_method": "cash",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(load["status"], "delivered");

    let (status, trip) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/complete"),
        owner,
        Some(json!({ "odometer_end": "1500", "photo_url": "https://photos/odo-end.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "completed");
    assert_eq!(dec(&trip["actual_miles"]), Decimal::from(500));
    assert_eq!(dec(&trip["totals"]["revenue"]), Decimal::from(2000));
    assert_eq!(dec(&trip["totals"]["driver_pay"]), Decimal::from(250));

    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/expenses"),
        owner,
        Some(json!({
            "category": "fuel",
            "amount": "200",
            "paid_by": "company_card",
            "receipt_url": "https://receipts/fuel.jpg",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, tolls) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/expenses"),
        owner,
        Some(json!({
            "category": "tolls",
            "amount": "40",
            "paid_by": "driver_personal",
            "receipt_url": "https://receipts/tolls.jpg",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tolls["trip_id"].as_str().unwrap(), trip_id);

    let (status, financials) = call(&app, "POST", &format!("/v1/trips/{trip_id}/recompute"), owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&financials["profit"]), Decimal::from(1510));

    let (status, preview) = call(
        &app,
        "GET",
        &format!("/v1/trips/{trip_id}/settlement-preview"),
        owner,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&preview["gross_pay"]), Decimal::from(250));
    assert_eq!(dec(&preview["reimbursements"]), Decimal::from(40));
    assert_eq!(dec(&preview["collections"]), Decimal::from(300));
    assert_eq!(dec(&preview["net_pay"]), Decimal::from(-10));

    let (status, trip) = call(&app, "POST", &format!("/v1/trips/{trip_id}/settle"), owner, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "settled");

    // Settled trips refuse new expenses.
    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/expenses"),
        owner,
        Some(json!({
            "category": "parking",
            "amount": "15",
            "paid_by": "company_card",
            "receipt_url": "https://receipts/parking.jpg",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "TRIP_CLOSED");
}

// -- Error Contracts ----------------------------------------------------------

#[tokio::test]
async fn test_out_of_order_transition_is_state_mismatch() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, load) = call(&app, "POST", "/v1/loads", owner, Some(json!({ "load_number": "L-1" }))).await;
    let load_id = id(&load);

    let (status, body) = call(&app, "POST", &format!("/v1/loads/{load_id}/start-delivery"), owner, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "STATE_MISMATCH");
    assert_eq!(body["error"]["details"]["current"], "pending");
    assert_eq!(body["error"]["details"]["expected"], json!(["loaded"]));
}

#[tokio::test]
async fn test_missing_evidence_is_validation_error() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, load) = call(&app, "POST", "/v1/loads", owner, Some(json!({ "load_number": "L-2" }))).await;
    let load_id = id(&load);
    call(&app, "POST", &format!("/v1/loads/{load_id}/accept"), owner, Some(json!({}))).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/loads/{load_id}/start-loading"),
        owner,
        Some(json!({ "photo_url": "https://photos/start.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "starting_cuft");

    let (_, load) = call(&app, "GET", &format!("/v1/loads/{load_id}"), owner, None).await;
    assert_eq!(load["status"], "accepted");
}

#[tokio::test]
async fn test_complete_with_undelivered_load_lists_pending() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, trip) = call(&app, "POST", "/v1/trips", owner, Some(json!({ "trip_number": "TR-7" }))).await;
    let trip_id = id(&trip);
    let load_id = loaded_load(&app, owner, "L-7", "1200").await;
    call(&app, "POST", &format!("/v1/trips/{trip_id}/loads"), owner, Some(json!({ "load_id": load_id }))).await;
    call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/activate"),
        owner,
        Some(json!({ "odometer_start": "100", "photo_url": "https://photos/s.jpg" })),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/complete"),
        owner,
        Some(json!({ "odometer_end": "400", "photo_url": "https://photos/e.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LOADS_PENDING");
    let pending = body["error"]["details"]["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["load_number"], "L-7");
    assert_eq!(pending[0]["status"], "loaded");
}

#[tokio::test]
async fn test_blocking_gate_refuses_expired_license() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, driver) = call(
        &app,
        "POST",
        "/v1/drivers",
        owner,
        Some(json!({ "name": "Sam Lee", "license_expiry": "2020-01-01" })),
    )
    .await;
    let (_, trip) = call(
        &app,
        "POST",
        "/v1/trips",
        owner,
        Some(json!({ "trip_number": "TR-9", "driver_id": id(&driver) })),
    )
    .await;
    let trip_id = id(&trip);
    let evidence = json!({
        "odometer_start": "10",
        "photo_url": "https://photos/s.jpg",
        "mode": "blocking",
    });

    let (status, body) = call(&app, "POST", &format!("/v1/trips/{trip_id}/activate"), owner, Some(evidence)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "COMPLIANCE_BLOCKED");
    assert_eq!(body["error"]["details"]["items"][0]["severity"], "expired");

    // Advisory mode lets the same trip through with the item attached.
    let (status, gated) = call(
        &app,
        "POST",
        &format!("/v1/trips/{trip_id}/activate"),
        owner,
        Some(json!({ "odometer_start": "10", "photo_url": "https://photos/s.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gated["trip"]["status"], "active");
    assert!(!gated["compliance"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tractor_without_trailer_is_incompatible() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, truck) = call(
        &app,
        "POST",
        "/v1/trucks",
        owner,
        Some(json!({ "unit_number": "TX-1", "vehicle_type": "tractor" })),
    )
    .await;
    let (status, body) = call(
        &app,
        "POST",
        "/v1/trips",
        owner,
        Some(json!({ "trip_number": "TR-11", "truck_id": id(&truck) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INCOMPATIBLE_EQUIPMENT");
}

// -- Roster -------------------------------------------------------------------

#[tokio::test]
async fn test_reorder_and_detach_keep_roster_contiguous() {
    let app = test_app();
    let owner = Uuid::new_v4();
    let (_, trip) = call(&app, "POST", "/v1/trips", owner, Some(json!({ "trip_number": "TR-R" }))).await;
    let trip_id = id(&trip);

    let mut loads = Vec::new();
    for n in 0..3 {
        let (_, load) = call(&app, "POST", "/v1/loads", owner, Some(json!({ "load_number": format!("L-R{n}") }))).await;
        let load_id = id(&load);
        call(&app, "POST", &format!("/v1/trips/{trip_id}/loads"), owner, Some(json!({ "load_id": load_id }))).await;
        loads.push(load_id);
    }

    let order = json!({ "load_ids": [loads[2], loads[0], loads[1]] });
    let (status, links) = call(&app, "PUT", &format!("/v1/trips/{trip_id}/reorder"), owner, Some(order)).await;
    assert_eq!(status, StatusCode::OK);
    let links = links.as_array().unwrap();
    assert_eq!(links[0]["load_id"].as_str().unwrap(), loads[2]);
    assert_eq!(links[2]["sequence_index"], 2);

    let (status, detached) = call(
        &app,
        "DELETE",
        &format!("/v1/trips/{trip_id}/loads/{}", loads[2]),
        owner,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detached["id"].as_str().unwrap(), loads[2]);

    let (_, links) = call(&app, "GET", &format!("/v1/trips/{trip_id}/links"), owner, None).await;
    let indices: Vec<u64> = links
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["sequence_index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![0, 1]);

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/v1/trips/{trip_id}/reorder"),
        owner,
        Some(json!({ "load_ids": [loads[0]] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["field"], "order");
}

// -- Compliance Reports -------------------------------------------------------

#[tokio::test]
async fn test_fleet_report_as_of_date() {
    let app = test_app();
    let owner = Uuid::new_v4();
    call(
        &app,
        "POST",
        "/v1/trailers",
        owner,
        Some(json!({ "unit_number": "TL-4", "registration_expiry": "2030-06-10" })),
    )
    .await;

    let (status, report) = call(&app, "GET", "/v1/compliance/fleet?as_of=2030-06-01", owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["generated_on"], "2030-06-01");
    assert_eq!(report["items"].as_array().unwrap().len(), 1);

    let (_, report) = call(&app, "GET", "/v1/compliance/fleet?as_of=2030-06-11", owner, None).await;
    assert_eq!(report["expired"], 1);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_json_is_served() {
    let (status, doc) = call(&test_app(), "GET", "/openapi.json", Uuid::new_v4(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/v1/trips/{id}/activate"].is_object());
    assert_eq!(doc["info"]["version"], "0.1.0");
}
