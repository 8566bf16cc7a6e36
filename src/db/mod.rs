pub mod cascade;
mod from_row;
pub mod queries;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::LicenseSettings;
use crate::error::Result;
use crate::services::{LicenseService, ProductService, ProductTypeService};

pub use from_row::{FromRow, query_all, query_one};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS product_types (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    handle TEXT NOT NULL UNIQUE,
    license_key_alphabet TEXT,
    license_key_length INTEGER,
    has_urls INTEGER NOT NULL DEFAULT 0,
    url_format TEXT,
    template TEXT,
    sku_format TEXT,
    field_layout_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    type_id TEXT NOT NULL REFERENCES product_types(id) ON DELETE CASCADE,
    sku TEXT NOT NULL UNIQUE,
    price INTEGER NOT NULL DEFAULT 0,
    promotable INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    post_date INTEGER,
    expiry_date INTEGER,
    tax_category_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_type ON products(type_id);

CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY,
    license_key TEXT NOT NULL,
    product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    order_id TEXT,
    user_id TEXT,
    owner_name TEXT,
    owner_email TEXT COLLATE NOCASE,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_product_key ON licenses(product_id, license_key);
CREATE INDEX IF NOT EXISTS idx_licenses_owner_email ON licenses(owner_email);
CREATE INDEX IF NOT EXISTS idx_licenses_user ON licenses(user_id);
CREATE INDEX IF NOT EXISTS idx_licenses_order ON licenses(order_id);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
    first_name TEXT,
    last_name TEXT,
    created_at INTEGER NOT NULL
);
";

/// Create the schema (idempotent) and enable foreign keys on this connection.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn manager_with_pragmas(manager: SqliteConnectionManager) -> SqliteConnectionManager {
    manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
}

/// File-backed pool. The schema is created through the first connection.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = manager_with_pragmas(SqliteConnectionManager::file(path));
    let pool = Pool::builder().max_size(8).build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    Ok(pool)
}

/// Single-connection in-memory pool; every `:memory:` connection is its own
/// database, so the pool must never open a second one.
pub fn create_memory_pool() -> Result<DbPool> {
    let manager = manager_with_pragmas(SqliteConnectionManager::memory());
    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    Ok(pool)
}

/// Shared state for the HTTP ingest router.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub product_types: Arc<ProductTypeService>,
    pub products: Arc<ProductService>,
    pub licenses: Arc<LicenseService>,
}

impl AppState {
    pub fn new(db: DbPool, settings: LicenseSettings) -> Self {
        let product_types = Arc::new(ProductTypeService::new());
        let products = Arc::new(ProductService::new(product_types.clone()));
        let licenses = Arc::new(LicenseService::new(settings, product_types.clone()));
        Self {
            db,
            product_types,
            products,
            licenses,
        }
    }

    /// Use a pre-configured license service (custom hooks or key generator).
    /// It must share `product_types` with this state.
    pub fn with_license_service(mut self, licenses: LicenseService) -> Self {
        self.licenses = Arc::new(licenses);
        self
    }

    pub fn settings(&self) -> &LicenseSettings {
        self.licenses.settings()
    }
}
