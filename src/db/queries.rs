use rusqlite::{Connection, params, types::Value};

use crate::error::Result;
use crate::models::*;
use crate::util::now;

use super::from_row::{
    FromRow, LICENSE_COLS, PRODUCT_COLS, PRODUCT_TYPE_COLS, USER_COLS, prefixed, query_all,
    query_one,
};

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
        }
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to an explicit value (including NULL).
    /// Use this for Option<T> where Some(v) = set to v, None = set to NULL.
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    /// `Some(inner)` writes `inner` (possibly NULL); `None` leaves the column alone.
    fn set_patch<V: Into<Value>>(self, column: &'static str, value: Option<Option<V>>) -> Self {
        match value {
            Some(inner) => self.set_nullable(column, inner),
            None => self,
        }
    }

    /// Always stamps `updated_at`, so an otherwise empty update still touches the row.
    fn execute(mut self, conn: &Connection) -> Result<bool> {
        self.fields.push(("updated_at", now().into()));
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Product Types ============

pub fn insert_product_type(conn: &Connection, product_type: &ProductType) -> Result<()> {
    conn.execute(
        "INSERT INTO product_types (id, name, handle, license_key_alphabet, license_key_length, has_urls, url_format, template, sku_format, field_layout_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            &product_type.id,
            &product_type.name,
            &product_type.handle,
            &product_type.license_key_alphabet,
            product_type.license_key_length,
            product_type.has_urls,
            &product_type.url_format,
            &product_type.template,
            &product_type.sku_format,
            &product_type.field_layout_id,
            product_type.created_at,
            product_type.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_product_type_by_id(conn: &Connection, id: &str) -> Result<Option<ProductType>> {
    query_one(
        conn,
        &format!("SELECT {} FROM product_types WHERE id = ?1", PRODUCT_TYPE_COLS),
        &[&id],
    )
}

pub fn list_product_types(conn: &Connection) -> Result<Vec<ProductType>> {
    query_all(
        conn,
        &format!("SELECT {} FROM product_types ORDER BY name, id", PRODUCT_TYPE_COLS),
        &[],
    )
}

pub fn update_product_type(conn: &Connection, id: &str, input: &UpdateProductType) -> Result<bool> {
    UpdateBuilder::new("product_types", id)
        .set_opt("name", input.name.clone())
        .set_opt("handle", input.handle.clone())
        .set_patch("license_key_alphabet", input.license_key_alphabet.clone())
        .set_patch("license_key_length", input.license_key_length)
        .set_opt("has_urls", input.has_urls)
        .set_patch("url_format", input.url_format.clone())
        .set_patch("template", input.template.clone())
        .set_patch("sku_format", input.sku_format.clone())
        .set_patch("field_layout_id", input.field_layout_id.clone())
        .execute(conn)
}

// ============ Products ============

pub fn insert_product(conn: &Connection, product: &Product) -> Result<()> {
    conn.execute(
        "INSERT INTO products (id, type_id, sku, price, promotable, enabled, post_date, expiry_date, tax_category_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &product.id,
            &product.type_id,
            &product.sku,
            product.price,
            product.promotable,
            product.enabled,
            product.post_date,
            product.expiry_date,
            &product.tax_category_id,
            product.created_at,
            product.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_product_by_id(conn: &Connection, id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLS),
        &[&id],
    )
}

pub fn list_products(conn: &Connection, type_id: Option<&str>) -> Result<Vec<Product>> {
    match type_id {
        Some(type_id) => query_all(
            conn,
            &format!(
                "SELECT {} FROM products WHERE type_id = ?1 ORDER BY created_at DESC, rowid DESC",
                PRODUCT_COLS
            ),
            &[&type_id],
        ),
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM products ORDER BY created_at DESC, rowid DESC",
                PRODUCT_COLS
            ),
            &[],
        ),
    }
}

/// Write every mutable column of an already validated product.
pub fn update_product(conn: &Connection, product: &Product) -> Result<bool> {
    UpdateBuilder::new("products", &product.id)
        .set("sku", product.sku.clone())
        .set("price", product.price)
        .set("promotable", product.promotable)
        .set("enabled", product.enabled)
        .set_nullable("post_date", product.post_date)
        .set_nullable("expiry_date", product.expiry_date)
        .set_nullable("tax_category_id", product.tax_category_id.clone())
        .execute(conn)
}

// ============ Licenses ============

pub fn insert_license(conn: &Connection, license: &License) -> Result<()> {
    conn.execute(
        "INSERT INTO licenses (id, license_key, product_id, order_id, user_id, owner_name, owner_email, enabled, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &license.id,
            &license.license_key,
            &license.product_id,
            &license.order_id,
            &license.user_id,
            &license.owner_name,
            &license.owner_email,
            license.enabled,
            license.created_at,
            license.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

pub fn get_license_by_key(
    conn: &Connection,
    product_id: &str,
    license_key: &str,
) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE product_id = ?1 AND license_key = ?2",
            LICENSE_COLS
        ),
        &[&product_id, &license_key],
    )
}

pub fn license_key_exists(conn: &Connection, product_id: &str, license_key: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM licenses WHERE product_id = ?1 AND license_key = ?2)",
        params![product_id, license_key],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Persist the mutable columns. Key and product are never rewritten.
pub fn update_license(conn: &Connection, license: &License) -> Result<bool> {
    UpdateBuilder::new("licenses", &license.id)
        .set_nullable("order_id", license.order_id.clone())
        .set_nullable("user_id", license.user_id.clone())
        .set_nullable("owner_name", license.owner_name.clone())
        .set_nullable("owner_email", license.owner_email.clone())
        .set("enabled", license.enabled)
        .execute(conn)
}

pub fn delete_license(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM licenses WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// FROM + WHERE clause and parameters shared by the license list and count queries.
fn license_filter(query: &LicenseQuery) -> (String, Vec<Value>) {
    let mut sql = String::from("FROM licenses l");
    if !query.unfiltered {
        sql.push_str(" JOIN products p ON p.id = l.product_id");
    }
    if query.email.is_some() {
        sql.push_str(" LEFT JOIN users u ON u.id = l.user_id");
    }
    sql.push_str(" WHERE 1=1");
    let mut values: Vec<Value> = Vec::new();

    if let Some(ref email) = query.owner_email {
        sql.push_str(" AND l.owner_email = ?");
        values.push(email.trim().to_string().into());
    }
    if let Some(ref email) = query.email {
        sql.push_str(" AND (l.owner_email = ? OR u.email = ?)");
        let email = email.trim().to_string();
        values.push(email.clone().into());
        values.push(email.into());
    }
    if let Some(ref user_id) = query.user_id {
        sql.push_str(" AND l.user_id = ?");
        values.push(user_id.clone().into());
    }
    if let Some(ref product_id) = query.product_id {
        sql.push_str(" AND l.product_id = ?");
        values.push(product_id.clone().into());
    }
    if let Some(ref type_id) = query.product_type_id {
        if query.unfiltered {
            sql.push_str(" AND l.product_id IN (SELECT id FROM products WHERE type_id = ?)");
        } else {
            sql.push_str(" AND p.type_id = ?");
        }
        values.push(type_id.clone().into());
    }
    if let Some(ref order_id) = query.order_id {
        sql.push_str(" AND l.order_id = ?");
        values.push(order_id.clone().into());
    }
    if let Some(enabled) = query.enabled {
        sql.push_str(" AND l.enabled = ?");
        values.push(enabled.into());
    }
    if let Some(after) = query.created_after {
        sql.push_str(" AND l.created_at >= ?");
        values.push(after.into());
    }
    if let Some(before) = query.created_before {
        sql.push_str(" AND l.created_at <= ?");
        values.push(before.into());
    }

    (sql, values)
}

/// Licenses matching `query`, newest first.
pub fn query_licenses(conn: &Connection, query: &LicenseQuery) -> Result<Vec<License>> {
    let (filter, mut values) = license_filter(query);
    let sql = format!(
        "SELECT {} {} ORDER BY l.created_at DESC, l.rowid DESC LIMIT ? OFFSET ?",
        prefixed(LICENSE_COLS, "l"),
        filter
    );
    // SQLite treats a negative LIMIT as "no limit"
    values.push(query.limit.unwrap_or(-1).into());
    values.push(query.offset.unwrap_or(0).into());

    let mut stmt = conn.prepare(&sql)?;
    let licenses = stmt
        .query_map(rusqlite::params_from_iter(values), License::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(licenses)
}

/// Number of licenses matching `query`, ignoring its pagination.
pub fn count_licenses(conn: &Connection, query: &LicenseQuery) -> Result<i64> {
    let (filter, values) = license_filter(query);
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", filter),
        rusqlite::params_from_iter(values),
        |row| row.get(0),
    )?;
    Ok(total)
}

// ============ Users ============

/// Insert or refresh a user mirror. A stale mirror holding the same email
/// under another id is replaced.
/// Insert or refresh a user mirror.
///
/// A stale mirror holding the same email under another id is replaced only
/// once no license is bound to it; otherwise the email's unique constraint
/// fails the insert and no license loses its account.
pub fn upsert_user(conn: &Connection, user: &User) -> Result<User> {
    let created_at = if user.created_at > 0 { user.created_at } else { now() };

    conn.execute(
        "DELETE FROM users WHERE email = ?1 AND id != ?2
         AND NOT EXISTS (SELECT 1 FROM licenses WHERE licenses.user_id = users.id)",
        params![&user.email, &user.id],
    )?;
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            email = excluded.email,
            first_name = excluded.first_name,
            last_name = excluded.last_name",
        params![&user.id, &user.email, &user.first_name, &user.last_name, created_at],
    )?;

    Ok(get_user_by_id(conn, &user.id)?.unwrap_or_else(|| User {
        created_at,
        ..user.clone()
    }))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email.trim()],
    )
}

pub fn delete_user(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
