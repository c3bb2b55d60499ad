//! Row types for every stage of the analysis.
//!
//! Each stage works on a fixed struct, never on string-keyed rows.

use crate::{
    month::Month,
    types::{CustomerId, StoreId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The minimal transaction view the trial core consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub month: Month,
    pub total_sales: f64,
}

/// One customer's segment, keyed by loyalty card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub customer_id: CustomerId,
    pub lifestage: String,
    pub premium_customer: String,
}

/// A raw chips transaction after parsing, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub txn_id: i64,
    pub product_nbr: i64,
    pub product_name: String,
    pub product_qty: u32,
    pub total_sales: f64,
}

/// A cleaned transaction merged with its customer's segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub date: NaiveDate,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub txn_id: i64,
    pub product_nbr: i64,
    pub product_name: String,
    pub brand: String,
    pub pack_size_g: Option<u32>,
    pub product_qty: u32,
    pub total_sales: f64,
    pub lifestage: String,
    pub premium_customer: String,
}

impl PurchaseRecord {
    pub fn month(&self) -> Month {
        Month::from_date(self.date)
    }

    pub fn to_transaction(&self) -> TransactionRecord {
        TransactionRecord {
            store_id: self.store_id,
            customer_id: self.customer_id,
            month: self.month(),
            total_sales: self.total_sales,
        }
    }
}

/// Project cleaned purchases onto the trial core's record type.
pub fn to_transactions(purchases: &[PurchaseRecord]) -> Vec<TransactionRecord> {
    purchases.iter().map(PurchaseRecord::to_transaction).collect()
}
