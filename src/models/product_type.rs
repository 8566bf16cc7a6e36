use serde::{Deserialize, Serialize};

use crate::config::LicenseSettings;
use crate::license_key::KeyFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: String,
    pub name: String,
    /// Unique across all product types
    pub handle: String,
    /// Overrides the global key alphabet when set
    pub license_key_alphabet: Option<String>,
    /// Overrides the global key length when set
    pub license_key_length: Option<i32>,
    pub has_urls: bool,
    pub url_format: Option<String>,
    pub template: Option<String>,
    /// e.g. `{typeHandle}-{id}`
    pub sku_format: Option<String>,
    /// Opaque reference into the host's field layouts
    pub field_layout_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProductType {
    /// Key format for licenses of this type, falling back to the global settings.
    pub fn key_format(&self, defaults: &LicenseSettings) -> KeyFormat {
        let alphabet = self
            .license_key_alphabet
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(&defaults.license_key_characters);
        let length = self
            .license_key_length
            .filter(|len| *len > 0)
            .map(|len| len as usize)
            .unwrap_or(defaults.license_key_length);
        KeyFormat::new(alphabet, length)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductType {
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub license_key_alphabet: Option<String>,
    #[serde(default)]
    pub license_key_length: Option<i32>,
    #[serde(default)]
    pub has_urls: bool,
    #[serde(default)]
    pub url_format: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub sku_format: Option<String>,
    #[serde(default)]
    pub field_layout_id: Option<String>,
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct UpdateProductType {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub license_key_alphabet: Option<Option<String>>,
    pub license_key_length: Option<Option<i32>>,
    pub has_urls: Option<bool>,
    pub url_format: Option<Option<String>>,
    pub template: Option<Option<String>>,
    pub sku_format: Option<Option<String>>,
    pub field_layout_id: Option<Option<String>>,
}
