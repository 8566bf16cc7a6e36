//! License issuance for completed orders.
//!
//! Every unit of every digital line item gets its own license. Units are
//! issued one at a time, each in its own transaction: a failing unit is
//! logged and counted, and the licenses already issued for the order stay
//! in place.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::events::OrderCompleted;
use crate::models::{CreateLicense, License, Order, Product, SaveOutcome};
use crate::services::LicenseService;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FulfillmentReport {
    pub order_id: String,
    pub issued: Vec<License>,
    /// Units a before-save hook declined
    pub vetoed: usize,
    /// Units whose license could not be created
    pub failed: usize,
}

impl FulfillmentReport {
    pub fn is_complete(&self) -> bool {
        self.vetoed == 0 && self.failed == 0
    }
}

/// Owner identity for licenses issued from `order`.
///
/// A registered customer binds the account and captures its name and email;
/// a guest is reachable through the checkout email only.
fn license_for_unit(product: &Product, order: &Order) -> CreateLicense {
    let customer = &order.customer;
    match customer.user {
        Some(ref user) => CreateLicense {
            product_id: Some(product.id.clone()),
            order_id: Some(order.id.clone()),
            user_id: Some(user.id.clone()),
            owner_name: user.full_name(),
            owner_email: Some(user.email.clone()),
            enabled: true,
        },
        None => CreateLicense {
            product_id: Some(product.id.clone()),
            order_id: Some(order.id.clone()),
            user_id: None,
            owner_name: None,
            owner_email: customer.email.clone(),
            enabled: true,
        },
    }
}

pub fn handle_order_completed(
    conn: &mut Connection,
    licenses: &LicenseService,
    event: &OrderCompleted,
) -> Result<FulfillmentReport> {
    let order = &event.order;
    let mut report = FulfillmentReport {
        order_id: order.id.clone(),
        ..FulfillmentReport::default()
    };

    for line_item in &order.line_items {
        let Some(product) = queries::get_product_by_id(conn, &line_item.purchasable_id)? else {
            tracing::debug!(
                "Order {}: purchasable {} is not a digital product",
                order.id,
                line_item.purchasable_id
            );
            continue;
        };

        for unit in 0..line_item.qty {
            match licenses.create(conn, license_for_unit(&product, order)) {
                Ok(SaveOutcome::Saved(license)) => report.issued.push(license),
                Ok(SaveOutcome::Vetoed) => report.vetoed += 1,
                Err(e) => {
                    tracing::error!(
                        "Order {}: failed to issue license {}/{} for product {}: {}",
                        order.id,
                        unit + 1,
                        line_item.qty,
                        product.id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        "Order {} fulfilled: {} license(s) issued, {} vetoed, {} failed",
        order.id,
        report.issued.len(),
        report.vetoed,
        report.failed
    );
    Ok(report)
}
