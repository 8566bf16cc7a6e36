use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    /// Unique within its product; never changes after issuance
    pub license_key: String,
    /// Never changes after issuance
    pub product_id: String,
    /// Order that generated the license (None = issued manually)
    pub order_id: Option<String>,
    /// Bound user account, if any
    pub user_id: Option<String>,
    /// Contact name used when no user account is bound
    pub owner_name: Option<String>,
    /// Contact email used when no user account is bound
    pub owner_email: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl License {
    /// Contact email for this license: the bound account's email when
    /// `user` is that account, otherwise the stored owner email.
    pub fn licensed_to<'a>(&'a self, user: Option<&'a User>) -> Option<&'a str> {
        match user {
            Some(user) if self.user_id.as_deref() == Some(user.id.as_str()) => {
                Some(user.email.as_str())
            }
            _ => self.owner_email.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicense {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CreateLicense {
    fn default() -> Self {
        Self {
            product_id: None,
            order_id: None,
            user_id: None,
            owner_name: None,
            owner_email: None,
            enabled: default_enabled(),
        }
    }
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateLicense {
    /// Only accepted when equal to the stored product
    pub product_id: Option<String>,
    pub order_id: Option<Option<String>>,
    pub user_id: Option<Option<String>>,
    pub owner_name: Option<Option<String>>,
    pub owner_email: Option<Option<String>>,
    pub enabled: Option<bool>,
}

/// Typed license filter. Every `Some` field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct LicenseQuery {
    pub owner_email: Option<String>,
    /// Owner email or the bound account's email
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    pub product_type_id: Option<String>,
    pub order_id: Option<String>,
    pub enabled: Option<bool>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Skip the default "has a product" join
    pub unfiltered: bool,
}

impl LicenseQuery {
    /// A query that also returns licenses whose product row cannot be joined.
    pub fn unfiltered() -> Self {
        Self {
            unfiltered: true,
            ..Self::default()
        }
    }

    pub fn owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = Some(email.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn product_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.product_type_id = Some(type_id.into());
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn created_between(mut self, after: Option<i64>, before: Option<i64>) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit.max(0));
        self.offset = Some(offset.max(0));
        self
    }
}

/// Result of a save that may have been vetoed by a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(License),
    /// A before-save hook declined; nothing was written
    Vetoed,
}

impl SaveOutcome {
    pub fn license(&self) -> Option<&License> {
        match self {
            SaveOutcome::Saved(license) => Some(license),
            SaveOutcome::Vetoed => None,
        }
    }

    pub fn into_license(self) -> Option<License> {
        match self {
            SaveOutcome::Saved(license) => Some(license),
            SaveOutcome::Vetoed => None,
        }
    }

    pub fn is_vetoed(&self) -> bool {
        matches!(self, SaveOutcome::Vetoed)
    }
}
