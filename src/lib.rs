//! License issuance and assignment for digital products.
//!
//! The crate issues uniquely keyed licenses when orders complete, rebinds
//! them as user accounts are activated or deleted, and can veto guest
//! checkouts that contain licensed goods. Host signals arrive either as
//! plain event structs or through the HTTP ingest router in [`handlers`].

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod fulfillment;
pub mod handlers;
pub mod hooks;
pub mod license_key;
pub mod models;
pub mod payment_gate;
pub mod services;
pub mod user_lifecycle;
pub mod util;
