use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Availability derived from `enabled`, `post_date` and `expiry_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProductStatus {
    Disabled,
    Pending,
    Expired,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub type_id: String,
    /// Unique across all products
    pub sku: String,
    /// Fixed-point, 1/10000 currency units
    pub price: i64,
    pub promotable: bool,
    pub enabled: bool,
    pub post_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub tax_category_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// A product without a post date counts as already posted.
    pub fn status_at(&self, now: i64) -> ProductStatus {
        if !self.enabled {
            return ProductStatus::Disabled;
        }
        if self.post_date.is_some_and(|post| post > now) {
            return ProductStatus::Pending;
        }
        if self.expiry_date.is_some_and(|expiry| expiry <= now) {
            return ProductStatus::Expired;
        }
        ProductStatus::Live
    }

    pub fn status(&self) -> ProductStatus {
        self.status_at(crate::util::now())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub type_id: String,
    /// Derived from the product type's SKU format when blank
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub promotable: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub post_date: Option<i64>,
    #[serde(default)]
    pub expiry_date: Option<i64>,
    #[serde(default)]
    pub tax_category_id: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub sku: Option<String>,
    pub price: Option<i64>,
    pub promotable: Option<bool>,
    pub enabled: Option<bool>,
    pub post_date: Option<Option<i64>>,
    pub expiry_date: Option<Option<i64>>,
    pub tax_category_id: Option<Option<String>>,
}
