mod licenses;
mod product_types;
mod products;

pub use licenses::{LicenseService, MAX_KEY_ATTEMPTS};
pub use product_types::{ProductTypeCache, ProductTypeService};
pub use products::{ProductService, render_sku};
