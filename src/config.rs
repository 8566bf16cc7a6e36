use std::env;

use crate::license_key::{DEFAULT_KEY_CHARACTERS, DEFAULT_KEY_LENGTH, MAX_KEY_LENGTH};

/// Licensing policy consumed by the issuance core and the event reactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSettings {
    /// Bind existing licenses to a user when an account with the owner email is activated
    pub auto_assign_licenses_on_user_registration: bool,
    /// Bind a new license to an existing account whose email matches the owner email
    pub auto_assign_user_on_purchase: bool,
    /// Reject guest checkouts that contain digital products
    pub require_logged_in_user: bool,
    /// Fallback alphabet for product types without their own
    pub license_key_characters: String,
    /// Fallback key length for product types without their own
    pub license_key_length: usize,
}

impl Default for LicenseSettings {
    fn default() -> Self {
        Self {
            auto_assign_licenses_on_user_registration: true,
            auto_assign_user_on_purchase: true,
            require_logged_in_user: false,
            license_key_characters: DEFAULT_KEY_CHARACTERS.to_string(),
            license_key_length: DEFAULT_KEY_LENGTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub license: LicenseSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let defaults = LicenseSettings::default();

        // An empty alphabet or a zero length can never produce a usable key
        let license_key_characters = env::var("LICENSE_KEY_CHARACTERS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.license_key_characters);
        let license_key_length = parse_key_length(
            env::var("LICENSE_KEY_LENGTH").ok().as_deref(),
            defaults.license_key_length,
        );

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "digital_products.db".to_string()),
            license: LicenseSettings {
                auto_assign_licenses_on_user_registration: env_flag(
                    "AUTO_ASSIGN_LICENSES_ON_USER_REGISTRATION",
                    defaults.auto_assign_licenses_on_user_registration,
                ),
                auto_assign_user_on_purchase: env_flag(
                    "AUTO_ASSIGN_USER_ON_PURCHASE",
                    defaults.auto_assign_user_on_purchase,
                ),
                require_logged_in_user: env_flag(
                    "REQUIRE_LOGGED_IN_USER",
                    defaults.require_logged_in_user,
                ),
                license_key_characters,
                license_key_length,
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| parse_flag(&v).unwrap_or(default))
        .unwrap_or(default)
}

/// Out-of-range or unparsable lengths fall back to `default`.
fn parse_key_length(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|len| (1..=MAX_KEY_LENGTH).contains(len))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
