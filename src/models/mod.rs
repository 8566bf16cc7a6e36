mod license;
mod order;
mod product;
mod product_type;
mod user;

pub use license::*;
pub use order::*;
pub use product::*;
pub use product_type::*;
pub use user::*;
