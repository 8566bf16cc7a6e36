//! Signals the host sends to the licensing core.

use serde::{Deserialize, Serialize};

use crate::models::{Order, Session, User};

/// An order has been paid and completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub order: Order,
}

/// A user account has been activated (after registration or verification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivated {
    pub user: User,
}

/// A user account is being deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user: User,
}

/// Fired before a payment request is sent to the gateway. Listeners may
/// clear `perform_action` to stop the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeGatewayRequest {
    pub order: Order,
    #[serde(default)]
    pub session: Session,
    #[serde(default = "default_perform_action")]
    pub perform_action: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn default_perform_action() -> bool {
    true
}

impl BeforeGatewayRequest {
    pub fn new(order: Order, session: Session) -> Self {
        Self {
            order,
            session,
            perform_action: true,
            error_message: None,
        }
    }
}
