//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use axum::{Router, body::Body, http::Request, response::Response};
use rusqlite::Connection;
use tower::ServiceExt;

pub use digital_products::config::LicenseSettings;
pub use digital_products::db::{AppState, DbPool, create_memory_pool, create_pool};
pub use digital_products::error::AppError;
pub use digital_products::license_key::{KeyFormat, KeyGenerator, generate_license_key};
pub use digital_products::models::*;
pub use digital_products::services::LicenseService;

pub fn create_test_app_state() -> AppState {
    create_test_app_state_with(LicenseSettings::default())
}

pub fn create_test_app_state_with(settings: LicenseSettings) -> AppState {
    let pool = create_memory_pool().expect("Failed to create test pool");
    AppState::new(pool, settings)
}

/// Swap in a license service built by `configure` (hooks, key generator).
pub fn with_license_service(
    state: AppState,
    configure: impl FnOnce(LicenseService) -> LicenseService,
) -> AppState {
    let service = configure(LicenseService::new(
        state.settings().clone(),
        state.product_types.clone(),
    ));
    state.with_license_service(service)
}

pub fn create_test_product_type(state: &AppState, conn: &Connection, handle: &str) -> ProductType {
    state
        .product_types
        .create(
            conn,
            CreateProductType {
                name: format!("{} licenses", handle),
                handle: handle.to_string(),
                ..Default::default()
            },
        )
        .expect("Failed to create test product type")
}

pub fn create_test_product_type_with_format(
    state: &AppState,
    conn: &Connection,
    handle: &str,
    alphabet: &str,
    length: i32,
) -> ProductType {
    state
        .product_types
        .create(
            conn,
            CreateProductType {
                name: format!("{} licenses", handle),
                handle: handle.to_string(),
                license_key_alphabet: Some(alphabet.to_string()),
                license_key_length: Some(length),
                ..Default::default()
            },
        )
        .expect("Failed to create test product type")
}

pub fn create_test_product(state: &AppState, conn: &Connection, type_id: &str, sku: &str) -> Product {
    state
        .products
        .create(
            conn,
            CreateProduct {
                type_id: type_id.to_string(),
                sku: Some(sku.to_string()),
                price: 490_000,
                enabled: true,
                ..Default::default()
            },
        )
        .expect("Failed to create test product")
}

pub fn create_test_user(conn: &Connection, id: &str, email: &str) -> User {
    digital_products::db::queries::upsert_user(conn, &test_user(id, email))
        .expect("Failed to create test user")
}

pub fn test_user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("Buyer".to_string()),
        created_at: 0,
    }
}

pub fn license_for_email(product_id: &str, email: &str) -> CreateLicense {
    CreateLicense {
        product_id: Some(product_id.to_string()),
        owner_email: Some(email.to_string()),
        enabled: true,
        ..Default::default()
    }
}

pub fn license_for_user(product_id: &str, user_id: &str) -> CreateLicense {
    CreateLicense {
        product_id: Some(product_id.to_string()),
        user_id: Some(user_id.to_string()),
        enabled: true,
        ..Default::default()
    }
}

/// Issue a license, panicking on veto or error.
pub fn issue(state: &AppState, conn: &mut Connection, input: CreateLicense) -> License {
    state
        .licenses
        .create(conn, input)
        .expect("Failed to create license")
        .into_license()
        .expect("License creation was vetoed")
}

pub fn order(id: &str, lines: &[(&str, u32)], customer: Customer) -> Order {
    Order {
        id: id.to_string(),
        line_items: lines
            .iter()
            .map(|(purchasable_id, qty)| LineItem {
                purchasable_id: purchasable_id.to_string(),
                qty: *qty,
            })
            .collect(),
        customer,
    }
}

pub fn guest(email: &str) -> Customer {
    Customer {
        user: None,
        email: Some(email.to_string()),
    }
}

/// Always returns the same key.
pub struct FixedKeyGenerator(pub String);

impl KeyGenerator for FixedKeyGenerator {
    fn generate(&self, _format: &KeyFormat) -> String {
        self.0.clone()
    }
}

/// Hands out queued keys, then falls back to random ones.
pub struct SequenceKeyGenerator {
    keys: Mutex<VecDeque<String>>,
}

impl SequenceKeyGenerator {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: Mutex::new(keys.iter().map(|k| k.to_string()).collect()),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn generate(&self, format: &KeyFormat) -> String {
        self.keys
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| generate_license_key(format.alphabet(), format.length()))
    }
}

pub fn app(state: AppState) -> Router {
    digital_products::handlers::router().with_state(state)
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
