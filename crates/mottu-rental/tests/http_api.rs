use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use mottu_rental::config::{Config, StorageBackend};
use mottu_rental::domain::FixedClock;
use mottu_rental::server::{build_router, AppState};
use mottu_rental::storage::MemoryStore;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const API_KEY: &str = "mottu-test-key";

fn test_app() -> Router {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.auth.api_key = Some(API_KEY.to_string());

    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
    let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(clock));
    build_router(state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-KEY", key);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router should not fail");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body should be JSON")
    };
    (status, json)
}

async fn authed(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call(app, method, uri, body, Some(API_KEY)).await
}

fn customer_body(national_id: &str, license_number: &str, license_type: &str) -> Value {
    json!({
        "name": "Maria Santos",
        "national_id": national_id,
        "birth_date": "1985-08-15",
        "license_number": license_number,
        "license_type": license_type,
    })
}

async fn create_customer(app: &Router) -> i64 {
    let (status, body) = authed(
        app,
        Method::POST,
        "/api/v1/customers",
        Some(customer_body("23456789011", "87654321099", "A")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("customer id")
}

async fn create_vehicle(app: &Router, plate: &str) -> i64 {
    let (status, body) = authed(
        app,
        Method::POST,
        "/api/v1/vehicles",
        Some(json!({"year": 2024, "model": "Honda Pop 110i", "plate": plate})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("vehicle id")
}

#[tokio::test]
async fn test_health_does_not_require_api_key() {
    let app = test_app();

    for uri in ["/health", "/api/v1/health"] {
        let (status, body) = call(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["status"], "healthy");
    }
}

#[tokio::test]
async fn test_resource_routes_require_api_key() {
    let app = test_app();

    let (status, body) = call(&app, Method::GET, "/api/v1/customers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MOTTU_AUTH_MISSING");

    let (status, body) = call(&app, Method::GET, "/api/v1/vehicles", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MOTTU_AUTH_ERROR");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/rentals",
        None,
        Some(&API_KEY.to_ascii_uppercase()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_customer_registration_rules() {
    let app = test_app();
    let id = create_customer(&app).await;

    let (status, body) = authed(&app, Method::GET, &format!("/api/v1/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["license_type"], "A");

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(customer_body("23456789011", "11111111111", "A")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MOTTU_DUPLICATE_IDENTIFIER");

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(customer_body("56789012344", "54321098766", "B")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOTTU_INELIGIBLE_LICENSE");

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(customer_body("123", "54321098766", "A")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOTTU_VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/rentals",
        Some(json!({"customer_id": "not-a-number"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOTTU_BAD_REQUEST");

    let (status, _) = authed(&app, Method::GET, "/api/v1/customers/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rental_flow_over_http() {
    let app = test_app();
    let customer_id = create_customer(&app).await;
    let vehicle_id = create_vehicle(&app, "abc-1234").await;

    let (status, vehicle) =
        authed(&app, Method::GET, &format!("/api/v1/vehicles/{vehicle_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vehicle["plate"], "ABC-1234");
    assert_eq!(vehicle["status"], "available");

    let (status, rental) = authed(
        &app,
        Method::POST,
        "/api/v1/rentals",
        Some(json!({"customer_id": customer_id, "expected_end": "2025-03-08T09:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rental["daily_rate"], "30.00");
    assert_eq!(rental["status"], "active");
    let rental_id = rental["id"].as_i64().expect("rental id");

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/rentals",
        Some(json!({"customer_id": customer_id, "expected_end": "2025-03-09T09:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MOTTU_ACTIVE_RENTAL_EXISTS");

    let (status, body) = authed(
        &app,
        Method::DELETE,
        &format!("/api/v1/vehicles/{vehicle_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MOTTU_VEHICLE_RENTED");

    let (status, settled) = authed(
        &app,
        Method::POST,
        &format!("/api/v1/rentals/{rental_id}/return"),
        Some(json!({"returned_at": "2025-03-10T18:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["settlement"]["kind"], "late");
    assert_eq!(settled["settlement"]["total"], "310.00");
    assert_eq!(settled["rental"]["status"], "completed");

    let (status, details) =
        authed(&app, Method::GET, &format!("/api/v1/rentals/{rental_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["customer_name"], "Maria Santos");
    assert_eq!(details["vehicle_plate"], "ABC-1234");
    assert_eq!(details["total_charge"], "310.00");

    let (status, _) = authed(
        &app,
        Method::DELETE,
        &format!("/api/v1/rentals/{rental_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) =
        authed(&app, Method::GET, &format!("/api/v1/rentals/{rental_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "MOTTU_RENTAL_NOT_FOUND");
}

#[tokio::test]
async fn test_vehicle_update_cannot_set_rented() {
    let app = test_app();
    let vehicle_id = create_vehicle(&app, "DEF-5678").await;
    let uri = format!("/api/v1/vehicles/{vehicle_id}");

    let (status, body) = authed(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"year": 2023, "model": "Yamaha Factor 150", "status": "rented"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOTTU_INVALID_VEHICLE_STATUS");

    let (status, _) = authed(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"year": 2023, "model": "Yamaha Factor 150", "status": "maintenance"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, vehicle) = authed(&app, Method::GET, &uri, None).await;
    assert_eq!(vehicle["status"], "maintenance");
    assert_eq!(vehicle["model"], "Yamaha Factor 150");
}

#[tokio::test]
async fn test_pagination_envelope() {
    let app = test_app();
    for plate in ["AAA-0001", "AAA-0002", "AAA-0003"] {
        create_vehicle(&app, plate).await;
    }

    let (status, page) = authed(
        &app,
        Method::GET,
        "/api/v1/vehicles?page_number=2&page_size=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["items"][0]["plate"], "AAA-0003");

    let (status, _) = authed(&app, Method::GET, "/api/v1/vehicles?page_size=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_estimate_risk() {
    let app = test_app();

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/customers/estimate-risk",
        Some(json!({"age": 21, "license_type": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "High");

    let (status, body) = authed(
        &app,
        Method::POST,
        "/api/v1/customers/estimate-risk",
        Some(json!({"age": 40, "license_type": "AB"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk"], "Low");
}
