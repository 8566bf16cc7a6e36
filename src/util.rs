//! Shared helpers for timestamps, identifiers and owner contact fields.

use chrono::Utc;
use uuid::Uuid;

/// Fixed-point scale for product prices (4 decimal places).
pub const PRICE_SCALE: i64 = 10_000;

pub fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trim an optional free-text field, turning blank input into `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Render a fixed-point price as `units.fraction` with all four decimals.
pub fn format_price(price: i64) -> String {
    let sign = if price < 0 { "-" } else { "" };
    let abs = price.unsigned_abs();
    let scale = PRICE_SCALE as u64;
    format!("{}{}.{:04}", sign, abs / scale, abs % scale)
}
