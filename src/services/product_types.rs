use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rusqlite::{Connection, TransactionBehavior};

use crate::db::{cascade, queries};
use crate::error::{AppError, Result, ValidationErrors};
use crate::license_key::MAX_KEY_LENGTH;
use crate::models::{CreateProductType, ProductType, UpdateProductType};
use crate::util::{gen_id, non_blank, now};

/// Product types read so far in this process.
///
/// Entries are filled lazily and dropped wholesale on any product type
/// write, so a read after a save always reaches the database. Each
/// invalidation bumps the generation; a fill read under an older generation
/// is discarded.
#[derive(Debug, Default)]
pub struct ProductTypeCache {
    by_id: HashMap<String, ProductType>,
    fetched_all: bool,
    generation: u64,
}

impl ProductTypeCache {
    pub fn get(&self, id: &str) -> Option<&ProductType> {
        self.by_id.get(id)
    }

    pub fn insert(&mut self, product_type: ProductType) {
        self.by_id.insert(product_type.id.clone(), product_type);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Insert a row read while `generation` was current. Returns false and
    /// drops the row when the cache was invalidated since.
    pub fn insert_if_current(&mut self, generation: u64, product_type: ProductType) -> bool {
        if generation != self.generation {
            return false;
        }
        self.insert(product_type);
        true
    }

    /// Every product type, sorted like the database listing, once `fill_all` ran.
    pub fn all(&self) -> Option<Vec<ProductType>> {
        if !self.fetched_all {
            return None;
        }
        let mut all: Vec<ProductType> = self.by_id.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Some(all)
    }

    pub fn fill_all(&mut self, product_types: Vec<ProductType>) {
        self.by_id = product_types
            .into_iter()
            .map(|pt| (pt.id.clone(), pt))
            .collect();
        self.fetched_all = true;
    }

    pub fn fill_all_if_current(&mut self, generation: u64, product_types: Vec<ProductType>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.fill_all(product_types);
        true
    }

    pub fn invalidate(&mut self) {
        self.by_id.clear();
        self.fetched_all = false;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ProductTypeService {
    cache: RwLock<ProductTypeCache>,
}

impl ProductTypeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_id(&self, conn: &Connection, id: &str) -> Result<Option<ProductType>> {
        let generation = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(product_type) = cache.get(id) {
                return Ok(Some(product_type.clone()));
            }
            if cache.fetched_all {
                return Ok(None);
            }
            cache.generation()
        };

        let found = queries::get_product_type_by_id(conn, id)?;
        if let Some(ref product_type) = found {
            self.cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert_if_current(generation, product_type.clone());
        }
        Ok(found)
    }

    pub fn get_by_handle(&self, conn: &Connection, handle: &str) -> Result<Option<ProductType>> {
        Ok(self
            .all(conn)?
            .into_iter()
            .find(|product_type| product_type.handle == handle))
    }

    pub fn all(&self, conn: &Connection) -> Result<Vec<ProductType>> {
        let generation = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(all) = cache.all() {
                return Ok(all);
            }
            cache.generation()
        };

        let all = queries::list_product_types(conn)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_all_if_current(generation, all.clone());
        Ok(all)
    }

    pub fn all_ids(&self, conn: &Connection) -> Result<Vec<String>> {
        Ok(self.all(conn)?.into_iter().map(|pt| pt.id).collect())
    }

    pub fn create(&self, conn: &Connection, input: CreateProductType) -> Result<ProductType> {
        let now = now();
        let product_type = ProductType {
            id: gen_id(),
            name: input.name.trim().to_string(),
            handle: input.handle.trim().to_string(),
            license_key_alphabet: input.license_key_alphabet,
            license_key_length: input.license_key_length,
            has_urls: input.has_urls,
            url_format: non_blank(input.url_format),
            template: non_blank(input.template),
            sku_format: non_blank(input.sku_format),
            field_layout_id: input.field_layout_id,
            created_at: now,
            updated_at: now,
        };
        validate(&product_type)?;

        let result = queries::insert_product_type(conn, &product_type);
        self.invalidate();
        result.map_err(|e| handle_taken(e, &product_type.handle))?;

        tracing::info!(
            "Created product type {} ({})",
            product_type.handle,
            product_type.id
        );
        Ok(product_type)
    }

    pub fn update(
        &self,
        conn: &Connection,
        id: &str,
        input: UpdateProductType,
    ) -> Result<ProductType> {
        let existing = queries::get_product_type_by_id(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("No product type exists with the ID “{}”", id)))?;

        let input = UpdateProductType {
            name: input.name.map(|n| n.trim().to_string()),
            handle: input.handle.map(|h| h.trim().to_string()),
            url_format: input.url_format.map(non_blank),
            template: input.template.map(non_blank),
            sku_format: input.sku_format.map(non_blank),
            ..input
        };

        let merged = ProductType {
            name: input.name.clone().unwrap_or(existing.name.clone()),
            handle: input.handle.clone().unwrap_or(existing.handle.clone()),
            license_key_alphabet: input
                .license_key_alphabet
                .clone()
                .unwrap_or(existing.license_key_alphabet.clone()),
            license_key_length: input.license_key_length.unwrap_or(existing.license_key_length),
            has_urls: input.has_urls.unwrap_or(existing.has_urls),
            url_format: input.url_format.clone().unwrap_or(existing.url_format.clone()),
            template: input.template.clone().unwrap_or(existing.template.clone()),
            sku_format: input.sku_format.clone().unwrap_or(existing.sku_format.clone()),
            field_layout_id: input
                .field_layout_id
                .clone()
                .unwrap_or(existing.field_layout_id.clone()),
            ..existing
        };
        validate(&merged)?;

        let result = queries::update_product_type(conn, id, &input);
        self.invalidate();
        result.map_err(|e| handle_taken(e, &merged.handle))?;

        queries::get_product_type_by_id(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("No product type exists with the ID “{}”", id)))
    }

    /// Delete a product type together with its products and their licenses.
    pub fn delete(&self, conn: &mut Connection, id: &str) -> Result<bool> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = cascade::delete_product_type_cascade(&tx, id)?;
        tx.commit()?;
        self.invalidate();

        if result.deleted {
            tracing::info!(
                "Deleted product type {} with {} product(s) and {} license(s)",
                id,
                result.products,
                result.licenses
            );
        }
        Ok(result.deleted)
    }

    pub fn invalidate(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate();
    }
}

fn validate(product_type: &ProductType) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if product_type.name.is_empty() {
        errors.add("name", "Name cannot be blank.");
    }
    if product_type.handle.is_empty() {
        errors.add("handle", "Handle cannot be blank.");
    } else if !is_valid_handle(&product_type.handle) {
        errors.add(
            "handle",
            "Handle must start with a letter and contain only letters, numbers, underscores and dashes.",
        );
    }
    if product_type
        .license_key_alphabet
        .as_deref()
        .is_some_and(str::is_empty)
    {
        errors.add("licenseKeyAlphabet", "License key alphabet cannot be empty.");
    }
    match product_type.license_key_length {
        Some(len) if len <= 0 => {
            errors.add("licenseKeyLength", "License key length must be greater than zero.");
        }
        Some(len) if len as usize > MAX_KEY_LENGTH => {
            errors.add(
                "licenseKeyLength",
                format!("License key length must be at most {}.", MAX_KEY_LENGTH),
            );
        }
        _ => {}
    }
    if product_type.has_urls && product_type.url_format.is_none() {
        errors.add("urlFormat", "URL Format cannot be blank.");
    }

    errors.into_result()
}

fn is_valid_handle(handle: &str) -> bool {
    let mut chars = handle.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn handle_taken(err: AppError, handle: &str) -> AppError {
    if err.is_unique_violation() {
        ValidationErrors::single(
            "handle",
            format!("Handle “{}” has already been taken.", handle),
        )
    } else {
        err
    }
}
