//! Row mapping for the license tables.
//!
//! Each `*_COLS` constant lists columns in the exact order its `FromRow`
//! impl reads them, so `SELECT {COLS} FROM ...` always lines up.

use rusqlite::{Connection, Row, ToSql};

use crate::error::Result;
use crate::models::{License, Product, ProductType, User};

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub const PRODUCT_TYPE_COLS: &str = "id, name, handle, license_key_alphabet, license_key_length, has_urls, url_format, template, sku_format, field_layout_id, created_at, updated_at";

pub const PRODUCT_COLS: &str = "id, type_id, sku, price, promotable, enabled, post_date, expiry_date, tax_category_id, created_at, updated_at";

pub const LICENSE_COLS: &str = "id, license_key, product_id, order_id, user_id, owner_name, owner_email, enabled, created_at, updated_at";

pub const USER_COLS: &str = "id, email, first_name, last_name, created_at";

/// Qualify every column with a table alias (`id, name` -> `l.id, l.name`).
pub fn prefixed(cols: &str, alias: &str) -> String {
    cols.split(", ")
        .map(|col| format!("{}.{}", alias, col))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromRow for ProductType {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ProductType {
            id: row.get(0)?,
            name: row.get(1)?,
            handle: row.get(2)?,
            license_key_alphabet: row.get(3)?,
            license_key_length: row.get(4)?,
            has_urls: row.get(5)?,
            url_format: row.get(6)?,
            template: row.get(7)?,
            sku_format: row.get(8)?,
            field_layout_id: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            type_id: row.get(1)?,
            sku: row.get(2)?,
            price: row.get(3)?,
            promotable: row.get(4)?,
            enabled: row.get(5)?,
            post_date: row.get(6)?,
            expiry_date: row.get(7)?,
            tax_category_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            license_key: row.get(1)?,
            product_id: row.get(2)?,
            order_id: row.get(3)?,
            user_id: row.get(4)?,
            owner_name: row.get(5)?,
            owner_email: row.get(6)?,
            enabled: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
