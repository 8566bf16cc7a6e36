mod events;
mod licenses;

pub use events::*;
pub use licenses::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/events/order-completed", post(order_completed))
        .route("/events/user-activated", post(user_activated))
        .route("/events/user-deleted", post(user_deleted))
        .route("/events/before-gateway-request", post(before_gateway_request))
        .route("/licenses/{id}", get(get_license))
}
