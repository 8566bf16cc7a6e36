use axum::{Json, extract::State};
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::events::{BeforeGatewayRequest, OrderCompleted, UserActivated, UserDeleted};
use crate::fulfillment::{FulfillmentReport, handle_order_completed};
use crate::payment_gate::check_before_gateway_request;
use crate::user_lifecycle::{ReleaseReport, handle_user_activated, handle_user_deleted};

#[derive(Debug, Serialize)]
pub struct BoundResponse {
    pub bound: usize,
}

/// POST /events/order-completed
pub async fn order_completed(
    State(state): State<AppState>,
    Json(event): Json<OrderCompleted>,
) -> Result<Json<FulfillmentReport>> {
    let mut conn = state.db.get()?;
    let report = handle_order_completed(&mut conn, &state.licenses, &event)?;
    Ok(Json(report))
}

/// POST /events/user-activated
pub async fn user_activated(
    State(state): State<AppState>,
    Json(event): Json<UserActivated>,
) -> Result<Json<BoundResponse>> {
    let mut conn = state.db.get()?;
    let bound = handle_user_activated(&mut conn, &state.licenses, &event)?;
    Ok(Json(BoundResponse { bound }))
}

/// POST /events/user-deleted
pub async fn user_deleted(
    State(state): State<AppState>,
    Json(event): Json<UserDeleted>,
) -> Result<Json<ReleaseReport>> {
    let mut conn = state.db.get()?;
    let report = handle_user_deleted(&mut conn, &state.licenses, &event)?;
    Ok(Json(report))
}

/// POST /events/before-gateway-request
///
/// Echoes the event back with the gate's decision applied.
pub async fn before_gateway_request(
    State(state): State<AppState>,
    Json(mut event): Json<BeforeGatewayRequest>,
) -> Result<Json<BeforeGatewayRequest>> {
    let conn = state.db.get()?;
    let decision = check_before_gateway_request(&conn, state.settings(), &event)?;
    event.apply(&decision);
    Ok(Json(event))
}
