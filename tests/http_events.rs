//! HTTP ingest of host signals.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

/// State with one product, returned alongside the product id.
fn seeded_state(settings: LicenseSettings) -> (AppState, String) {
    let state = create_test_app_state_with(settings);
    let product_id = {
        let conn = state.db.get().unwrap();
        let pt = create_test_product_type(&state, &conn, "plugin");
        create_test_product(&state, &conn, &pt.id, "PLUGIN-1").id
    };
    (state, product_id)
}

#[tokio::test]
async fn test_health() {
    let response = get(app(create_test_app_state()), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_completed_returns_report() {
    let (state, product_id) = seeded_state(LicenseSettings::default());

    let response = post_json(
        app(state),
        "/events/order-completed",
        json!({
            "order": {
                "id": "order-1",
                "lineItems": [
                    { "purchasableId": product_id, "qty": 2 },
                    { "purchasableId": "mug", "qty": 1 }
                ],
                "customer": { "email": "guest@example.com" }
            }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["order_id"], "order-1");
    assert_eq!(body["issued"].as_array().unwrap().len(), 2);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["issued"][0]["owner_email"], "guest@example.com");
}

#[tokio::test]
async fn test_user_activated_reports_bound_count() {
    let (state, product_id) = seeded_state(LicenseSettings::default());
    {
        let mut conn = state.db.get().unwrap();
        issue(&state, &mut conn, license_for_email(&product_id, "new@example.com"));
    }

    let response = post_json(
        app(state),
        "/events/user-activated",
        json!({ "user": { "id": "user-1", "email": "new@example.com" } }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "bound": 1 }));
}

#[tokio::test]
async fn test_user_deleted_reports_released_count() {
    let (state, product_id) = seeded_state(LicenseSettings::default());
    {
        let mut conn = state.db.get().unwrap();
        create_test_user(&conn, "user-1", "bye@example.com");
        issue(&state, &mut conn, license_for_user(&product_id, "user-1"));
        issue(&state, &mut conn, license_for_user(&product_id, "user-1"));
    }

    let response = post_json(
        app(state),
        "/events/user-deleted",
        json!({ "user": { "id": "user-1", "email": "bye@example.com" } }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "released": 2, "vetoed": 0 }));
}

#[tokio::test]
async fn test_before_gateway_request_rejects_guest() {
    let (state, product_id) = seeded_state(LicenseSettings {
        require_logged_in_user: true,
        ..LicenseSettings::default()
    });

    let response = post_json(
        app(state),
        "/events/before-gateway-request",
        json!({
            "order": {
                "id": "order-1",
                "lineItems": [{ "purchasableId": product_id, "qty": 1 }]
            },
            "session": {}
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["performAction"], false);
    assert_eq!(
        body["errorMessage"],
        "You must be logged in to purchase digital products."
    );
}

#[tokio::test]
async fn test_before_gateway_request_allows_logged_in_user() {
    let (state, product_id) = seeded_state(LicenseSettings {
        require_logged_in_user: true,
        ..LicenseSettings::default()
    });

    let response = post_json(
        app(state),
        "/events/before-gateway-request",
        json!({
            "order": {
                "id": "order-1",
                "lineItems": [{ "purchasableId": product_id, "qty": 1 }]
            },
            "session": { "userId": "user-1" }
        }),
    )
    .await;

    let body = body_json(response).await;
    assert_eq!(body["performAction"], true);
    assert!(body["errorMessage"].is_null());
}

#[tokio::test]
async fn test_get_license() {
    let (state, product_id) = seeded_state(LicenseSettings::default());
    let license = {
        let mut conn = state.db.get().unwrap();
        issue(&state, &mut conn, license_for_email(&product_id, "x@example.com"))
    };

    let response = get(app(state.clone()), &format!("/licenses/{}", license.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["license_key"], license.license_key.as_str());
    assert_eq!(body["product_id"], product_id.as_str());

    let response = get(app(state), "/licenses/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_event_is_client_error() {
    let response = post_json(
        app(create_test_app_state()),
        "/events/user-activated",
        json!({ "user": { "id": "user-1" } }),
    )
    .await;

    assert!(response.status().is_client_error());
}
