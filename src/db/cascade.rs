//! Application-level cascading deletes.
//!
//! The schema also declares `ON DELETE CASCADE`, but deletes are driven
//! explicitly here so the affected row counts are known and the whole
//! cascade runs inside the caller's transaction.
//!
//! # Cascade Hierarchy
//!
//! ```text
//! product_types (root)
//! └── products (depth 1)
//!     └── licenses (depth 2)
//!
//! products (can be deleted directly)
//! └── licenses (depth 1)
//! ```

use rusqlite::{Connection, params};

use crate::error::Result;

/// Subquery for cascade DELETE: finds products of a product type.
pub const PRODUCTS_OF_TYPE_SUBQUERY: &str = "SELECT id FROM products WHERE type_id = ?1";

/// Rows removed by one cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeResult {
    /// Whether the root entity existed and was removed
    pub deleted: bool,
    pub products: usize,
    pub licenses: usize,
}

/// Delete child rows that reference `parent_id` through a direct foreign key.
pub fn delete_children_direct(
    conn: &Connection,
    child_table: &str,
    fk_column: &str,
    parent_id: &str,
) -> Result<usize> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", child_table, fk_column);
    let deleted = conn.execute(&sql, params![parent_id])?;
    Ok(deleted)
}

/// Delete child rows whose foreign key is in `subquery` (for transitive relationships).
///
/// Example: delete licenses where `product_id IN (SELECT id FROM products WHERE type_id = ?1)`
pub fn delete_children_via_subquery(
    conn: &Connection,
    child_table: &str,
    fk_column: &str,
    subquery: &str,
    parent_id: &str,
) -> Result<usize> {
    let sql = format!(
        "DELETE FROM {} WHERE {} IN ({})",
        child_table, fk_column, subquery
    );
    let deleted = conn.execute(&sql, params![parent_id])?;
    Ok(deleted)
}

fn delete_entity(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table);
    Ok(conn.execute(&sql, params![id])? > 0)
}

/// Product -> its licenses.
pub fn delete_product_cascade(conn: &Connection, product_id: &str) -> Result<CascadeResult> {
    let licenses = delete_children_direct(conn, "licenses", "product_id", product_id)?;
    let deleted = delete_entity(conn, "products", product_id)?;
    Ok(CascadeResult {
        deleted,
        products: usize::from(deleted),
        licenses,
    })
}

/// Product type -> its products -> their licenses.
pub fn delete_product_type_cascade(conn: &Connection, type_id: &str) -> Result<CascadeResult> {
    let licenses = delete_children_via_subquery(
        conn,
        "licenses",
        "product_id",
        PRODUCTS_OF_TYPE_SUBQUERY,
        type_id,
    )?;
    let products = delete_children_direct(conn, "products", "type_id", type_id)?;
    let deleted = delete_entity(conn, "product_types", type_id)?;
    Ok(CascadeResult {
        deleted,
        products,
        licenses,
    })
}
