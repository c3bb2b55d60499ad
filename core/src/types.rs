//! Shared primitive types used across the entire analysis.

/// A retail store number (`STORE_NBR`).
pub type StoreId = i64;

/// A loyalty card number (`LYLTY_CARD_NBR`). One card = one customer.
pub type CustomerId = i64;

/// The canonical run identifier.
pub type RunId = String;

/// A fresh run identifier of the form `run-<uuid>`.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}
