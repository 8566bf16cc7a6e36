//! Guest checkout policy for orders containing digital products.

use rusqlite::Connection;

use crate::config::LicenseSettings;
use crate::db::queries;
use crate::error::Result;
use crate::events::BeforeGatewayRequest;
use crate::models::Order;

pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to purchase digital products.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Reject { message: String },
}

impl BeforeGatewayRequest {
    /// Record a rejection on the event payload; `Allow` leaves it untouched.
    pub fn apply(&mut self, decision: &GateDecision) {
        if let GateDecision::Reject { message } = decision {
            self.perform_action = false;
            self.error_message = Some(message.clone());
        }
    }
}

/// True when any line item resolves to a digital product, whatever its quantity.
pub fn contains_digital_product(conn: &Connection, order: &Order) -> Result<bool> {
    for line_item in &order.line_items {
        if queries::get_product_by_id(conn, &line_item.purchasable_id)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn check_before_gateway_request(
    conn: &Connection,
    settings: &LicenseSettings,
    event: &BeforeGatewayRequest,
) -> Result<GateDecision> {
    if !settings.require_logged_in_user || !event.session.is_guest() {
        return Ok(GateDecision::Allow);
    }

    if contains_digital_product(conn, &event.order)? {
        tracing::warn!(
            "Rejected guest payment for order {} containing digital products",
            event.order.id
        );
        return Ok(GateDecision::Reject {
            message: LOGIN_REQUIRED_MESSAGE.to_string(),
        });
    }

    Ok(GateDecision::Allow)
}
