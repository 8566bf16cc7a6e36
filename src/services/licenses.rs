//! License issuance and maintenance.
//!
//! Creating a license validates the owner identity, optionally binds an
//! existing account by email, generates a key from the product type's
//! format and inserts it inside an IMMEDIATE transaction. The
//! `(product_id, license_key)` unique index is the source of truth for key
//! uniqueness: the pre-insert existence check only avoids pointless
//! round-trips, and a UNIQUE violation at insert time triggers a fresh key.

use std::sync::Arc;

use rusqlite::{Connection, TransactionBehavior};

use crate::config::LicenseSettings;
use crate::db::queries;
use crate::error::{AppError, Result, ValidationErrors};
use crate::hooks::{HookDecision, LicenseEvent, LicenseHooks};
use crate::license_key::{KeyFormat, KeyGenerator, RandomKeyGenerator};
use crate::models::{CreateLicense, License, LicenseQuery, SaveOutcome, UpdateLicense};
use crate::util::{gen_id, non_blank, now};

use super::ProductTypeService;

/// Key candidates tried per license before giving up with a conflict.
pub const MAX_KEY_ATTEMPTS: usize = 16;

const MISSING_OWNER: &str = "A license must have either an email or a licensee assigned to it.";

pub struct LicenseService {
    settings: LicenseSettings,
    product_types: Arc<ProductTypeService>,
    key_generator: Box<dyn KeyGenerator>,
    hooks: LicenseHooks,
}

impl LicenseService {
    pub fn new(settings: LicenseSettings, product_types: Arc<ProductTypeService>) -> Self {
        Self {
            settings,
            product_types,
            key_generator: Box::new(RandomKeyGenerator),
            hooks: LicenseHooks::new(),
        }
    }

    pub fn with_key_generator(mut self, generator: impl KeyGenerator + 'static) -> Self {
        self.key_generator = Box::new(generator);
        self
    }

    pub fn settings(&self) -> &LicenseSettings {
        &self.settings
    }

    pub fn hooks_mut(&mut self) -> &mut LicenseHooks {
        &mut self.hooks
    }

    pub fn find_by_id(&self, conn: &Connection, id: &str) -> Result<Option<License>> {
        queries::get_license_by_id(conn, id)
    }

    pub fn find_by_key(
        &self,
        conn: &Connection,
        product_id: &str,
        license_key: &str,
    ) -> Result<Option<License>> {
        queries::get_license_by_key(conn, product_id, license_key.trim())
    }

    /// Contact email of `license`, resolving its bound account if any.
    pub fn licensed_to(&self, conn: &Connection, license: &License) -> Result<Option<String>> {
        let user = match license.user_id.as_deref() {
            Some(user_id) => queries::get_user_by_id(conn, user_id)?,
            None => None,
        };
        Ok(license.licensed_to(user.as_ref()).map(str::to_string))
    }

    /// True when `user_id` holds an enabled license for `product_id`.
    pub fn is_licensed(&self, conn: &Connection, user_id: &str, product_id: &str) -> Result<bool> {
        let query = LicenseQuery::default()
            .user_id(user_id)
            .product_id(product_id)
            .enabled(true);
        Ok(self.count(conn, &query)? > 0)
    }

    pub fn find(&self, conn: &Connection, query: &LicenseQuery) -> Result<Vec<License>> {
        queries::query_licenses(conn, query)
    }

    pub fn count(&self, conn: &Connection, query: &LicenseQuery) -> Result<i64> {
        queries::count_licenses(conn, query)
    }

    /// Issue a new license.
    ///
    /// Validation problems come back as `AppError::Validation`; a product or
    /// product type that cannot be resolved is `AppError::NotFound`.
    pub fn create(&self, conn: &mut Connection, input: CreateLicense) -> Result<SaveOutcome> {
        let product_id = non_blank(input.product_id);
        let mut user_id = non_blank(input.user_id);
        let mut owner_name = non_blank(input.owner_name);
        let mut owner_email = non_blank(input.owner_email);

        let mut errors = ValidationErrors::new();
        if product_id.is_none() {
            errors.add("productId", "Product cannot be blank.");
        }
        check_owner(&mut errors, user_id.as_deref(), owner_email.as_deref());
        errors.into_result()?;

        if self.settings.auto_assign_user_on_purchase && user_id.is_none() {
            if let Some(email) = owner_email.as_deref() {
                if let Some(user) = queries::get_user_by_email(conn, email)? {
                    tracing::debug!("Binding new license for {} to user {}", email, user.id);
                    user_id = Some(user.id);
                    owner_name = None;
                    owner_email = None;
                }
            }
        }

        let product_id = product_id.unwrap_or_default();
        let product = queries::get_product_by_id(conn, &product_id)?.ok_or_else(|| {
            AppError::NotFound(format!("No product exists with the ID “{}”", product_id))
        })?;
        let product_type = self
            .product_types
            .get_by_id(conn, &product.type_id)?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No product type exists with the ID “{}”",
                    product.type_id
                ))
            })?;
        let format = product_type.key_format(&self.settings);

        let now = now();
        let mut license = License {
            id: gen_id(),
            license_key: self.next_key(conn, &product.id, &format)?,
            product_id: product.id.clone(),
            order_id: non_blank(input.order_id),
            user_id,
            owner_name,
            owner_email,
            enabled: input.enabled,
            created_at: now,
            updated_at: now,
        };

        if self.hooks.before_save(&LicenseEvent {
            license: &license,
            is_new: true,
        }) == HookDecision::Veto
        {
            tracing::warn!("License for product {} vetoed before save", product.id);
            return Ok(SaveOutcome::Vetoed);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut attempts = 1;
        loop {
            match queries::insert_license(&tx, &license) {
                Ok(()) => break,
                Err(e) if e.is_unique_violation() && attempts < MAX_KEY_ATTEMPTS => {
                    tracing::warn!(
                        "License key collision on insert for product {}, regenerating",
                        product.id
                    );
                    license.license_key = self.next_key(&tx, &product.id, &format)?;
                    attempts += 1;
                }
                Err(e) if e.is_unique_violation() => {
                    return Err(AppError::Conflict(format!(
                        "Could not generate a unique license key for product {} after {} attempts",
                        product.id, MAX_KEY_ATTEMPTS
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;

        self.hooks.after_save(&LicenseEvent {
            license: &license,
            is_new: true,
        });

        tracing::info!(
            "Issued license {} for product {} (order: {:?})",
            license.id,
            license.product_id,
            license.order_id
        );
        Ok(SaveOutcome::Saved(license))
    }

    /// Apply `changes` to a stored license. The key is never regenerated and
    /// the product binding cannot change.
    pub fn update(
        &self,
        conn: &mut Connection,
        id: &str,
        changes: UpdateLicense,
    ) -> Result<SaveOutcome> {
        let existing = queries::get_license_by_id(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("No license exists with the ID “{}”", id)))?;

        let mut errors = ValidationErrors::new();
        if let Some(product_id) = changes.product_id.as_deref() {
            if product_id.trim() != existing.product_id {
                errors.add("productId", "The product of an existing license cannot be changed.");
            }
        }

        let mut license = existing.clone();
        if let Some(order_id) = changes.order_id {
            license.order_id = non_blank(order_id);
        }
        if let Some(user_id) = changes.user_id {
            license.user_id = non_blank(user_id);
        }
        if let Some(owner_name) = changes.owner_name {
            license.owner_name = non_blank(owner_name);
        }
        if let Some(owner_email) = changes.owner_email {
            license.owner_email = non_blank(owner_email);
        }
        if let Some(enabled) = changes.enabled {
            license.enabled = enabled;
        }

        check_owner(
            &mut errors,
            license.user_id.as_deref(),
            license.owner_email.as_deref(),
        );
        errors.into_result()?;

        if self.hooks.before_save(&LicenseEvent {
            license: &license,
            is_new: false,
        }) == HookDecision::Veto
        {
            tracing::warn!("Update of license {} vetoed before save", license.id);
            return Ok(SaveOutcome::Vetoed);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        queries::update_license(&tx, &license)?;
        let stored = queries::get_license_by_id(&tx, id)?
            .ok_or_else(|| AppError::NotFound(format!("No license exists with the ID “{}”", id)))?;
        tx.commit()?;

        self.hooks.after_save(&LicenseEvent {
            license: &stored,
            is_new: false,
        });
        Ok(SaveOutcome::Saved(stored))
    }

    /// Remove a license. `Ok(false)` when it does not exist or a hook vetoed.
    pub fn delete(&self, conn: &mut Connection, id: &str) -> Result<bool> {
        let Some(license) = queries::get_license_by_id(conn, id)? else {
            return Ok(false);
        };

        let event = LicenseEvent {
            license: &license,
            is_new: false,
        };
        if self.hooks.before_delete(&event) == HookDecision::Veto {
            tracing::warn!("Deletion of license {} vetoed", license.id);
            return Ok(false);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deleted = queries::delete_license(&tx, id)?;
        tx.commit()?;

        if deleted {
            self.hooks.after_delete(&event);
            tracing::info!("Deleted license {}", license.id);
        }
        Ok(deleted)
    }

    /// Draw keys until one is unused for `product_id`.
    fn next_key(&self, conn: &Connection, product_id: &str, format: &KeyFormat) -> Result<String> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = self.key_generator.generate(format);
            if key.is_empty() {
                return Err(AppError::Internal(
                    "License key format produced an empty key".into(),
                ));
            }
            if !queries::license_key_exists(conn, product_id, &key)? {
                return Ok(key);
            }
            tracing::warn!("License key collision for product {}, regenerating", product_id);
        }
        Err(AppError::Conflict(format!(
            "Could not generate a unique license key for product {} after {} attempts",
            product_id, MAX_KEY_ATTEMPTS
        )))
    }
}

impl std::fmt::Debug for LicenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseService")
            .field("settings", &self.settings)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn check_owner(errors: &mut ValidationErrors, user_id: Option<&str>, owner_email: Option<&str>) {
    if user_id.is_none() && owner_email.is_none() {
        errors.add("userId", MISSING_OWNER);
        errors.add("ownerEmail", MISSING_OWNER);
    }
}
