use std::sync::Arc;

use rusqlite::{Connection, TransactionBehavior};

use crate::db::{cascade, queries};
use crate::error::{AppError, Result, ValidationErrors};
use crate::models::{CreateProduct, Product, ProductType, UpdateProduct};
use crate::util::{format_price, gen_id, non_blank, now};

use super::ProductTypeService;

/// Fill `{id}`, `{typeHandle}`, `{typeId}` and `{price}` into a SKU format.
///
/// Returns `None` when the format is blank or names an unknown placeholder.
pub fn render_sku(format: &str, product: &Product, product_type: &ProductType) -> Option<String> {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let value = match after[..end].trim() {
            "id" => product.id.clone(),
            "typeHandle" => product_type.handle.clone(),
            "typeId" => product_type.id.clone(),
            "price" => format_price(product.price),
            _ => return None,
        };
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    let sku = out.trim().to_string();
    if sku.is_empty() { None } else { Some(sku) }
}

#[derive(Debug)]
pub struct ProductService {
    product_types: Arc<ProductTypeService>,
}

impl ProductService {
    pub fn new(product_types: Arc<ProductTypeService>) -> Self {
        Self { product_types }
    }

    pub fn get_by_id(&self, conn: &Connection, id: &str) -> Result<Option<Product>> {
        queries::get_product_by_id(conn, id)
    }

    pub fn list(&self, conn: &Connection, type_id: Option<&str>) -> Result<Vec<Product>> {
        queries::list_products(conn, type_id)
    }

    pub fn create(&self, conn: &Connection, input: CreateProduct) -> Result<Product> {
        let product_type = self.require_type(conn, &input.type_id)?;

        let now = now();
        let mut product = Product {
            id: gen_id(),
            type_id: product_type.id.clone(),
            sku: non_blank(input.sku).unwrap_or_default(),
            price: input.price,
            promotable: input.promotable,
            enabled: input.enabled,
            post_date: input.post_date,
            expiry_date: input.expiry_date,
            tax_category_id: input.tax_category_id,
            created_at: now,
            updated_at: now,
        };
        derive_sku(&mut product, &product_type);
        validate(&product)?;

        queries::insert_product(conn, &product).map_err(|e| sku_taken(e, &product.sku))?;

        tracing::info!("Created product {} ({})", product.sku, product.id);
        Ok(product)
    }

    pub fn update(&self, conn: &Connection, id: &str, input: UpdateProduct) -> Result<Product> {
        let existing = queries::get_product_by_id(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("No product exists with the ID “{}”", id)))?;
        let product_type = self.require_type(conn, &existing.type_id)?;

        let mut product = Product {
            sku: match input.sku {
                Some(sku) => non_blank(Some(sku)).unwrap_or_default(),
                None => existing.sku.clone(),
            },
            price: input.price.unwrap_or(existing.price),
            promotable: input.promotable.unwrap_or(existing.promotable),
            enabled: input.enabled.unwrap_or(existing.enabled),
            post_date: input.post_date.unwrap_or(existing.post_date),
            expiry_date: input.expiry_date.unwrap_or(existing.expiry_date),
            tax_category_id: input
                .tax_category_id
                .unwrap_or(existing.tax_category_id.clone()),
            ..existing
        };
        derive_sku(&mut product, &product_type);
        validate(&product)?;

        queries::update_product(conn, &product).map_err(|e| sku_taken(e, &product.sku))?;

        queries::get_product_by_id(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("No product exists with the ID “{}”", id)))
    }

    /// Delete a product and every license issued for it.
    pub fn delete(&self, conn: &mut Connection, id: &str) -> Result<bool> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = cascade::delete_product_cascade(&tx, id)?;
        tx.commit()?;

        if result.deleted {
            tracing::info!("Deleted product {} and {} license(s)", id, result.licenses);
        }
        Ok(result.deleted)
    }

    fn require_type(&self, conn: &Connection, type_id: &str) -> Result<ProductType> {
        self.product_types.get_by_id(conn, type_id)?.ok_or_else(|| {
            AppError::NotFound(format!("No product type exists with the ID “{}”", type_id))
        })
    }
}

/// Blank SKUs are rendered from the type's format; failure leaves them blank.
fn derive_sku(product: &mut Product, product_type: &ProductType) {
    if !product.sku.is_empty() {
        return;
    }
    if let Some(format) = product_type.sku_format.as_deref() {
        if let Some(sku) = render_sku(format, product, product_type) {
            product.sku = sku;
        }
    }
}

fn validate(product: &Product) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if product.sku.is_empty() {
        errors.add("sku", "SKU cannot be blank.");
    }
    if product.price < 0 {
        errors.add("price", "Price cannot be negative.");
    }
    if let (Some(post), Some(expiry)) = (product.post_date, product.expiry_date) {
        if expiry <= post {
            errors.add("expiryDate", "Expiry date must be after the post date.");
        }
    }

    errors.into_result()
}

fn sku_taken(err: AppError, sku: &str) -> AppError {
    if err.is_unique_violation() {
        ValidationErrors::single("sku", format!("SKU “{}” has already been taken.", sku))
    } else {
        err
    }
}
