//! Commerce payloads handed over by the host. Never persisted here.

use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Id of the purchased element; a digital product when it resolves to one
    pub purchasable_id: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Registered account behind the customer, if any
    #[serde(default)]
    pub user: Option<User>,
    /// Guest checkout email
    #[serde(default)]
    pub email: Option<String>,
}

/// The storefront session a checkout runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Session {
    pub fn guest() -> Self {
        Self { user_id: None }
    }

    pub fn logged_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}
