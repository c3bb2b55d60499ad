//! Data cleansing for raw chips transactions.
//!
//! Stages, in order:
//!   1. Exact duplicate rows removed (first occurrence kept)
//!   2. Bulk-purchase outliers removed
//!   3. Trading calendar checked for dates with no transactions
//!   4. Non-chips products removed by name
//!   5. Pack size and canonical brand derived from the product name
//!   6. Rows joined to the customer-segment table on loyalty card
//!
//! Every removal is counted in the CleaningReport.

use crate::{
    config::CleaningConfig,
    record::{CustomerSegment, PurchaseRecord, RawTransaction},
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub raw_rows: usize,
    pub duplicates_removed: usize,
    pub bulk_outliers_removed: usize,
    pub excluded_products_removed: usize,
    pub unmatched_customers_removed: usize,
    pub duplicate_segment_keys: usize,
    pub purchases: usize,
    /// Calendar dates between the first and last transaction with no sales.
    pub missing_dates: Vec<NaiveDate>,
}

/// Run every cleaning stage over `raw`.
pub fn clean(
    raw: Vec<RawTransaction>,
    segments: &[CustomerSegment],
    config: &CleaningConfig,
) -> (Vec<PurchaseRecord>, CleaningReport) {
    let mut report = CleaningReport {
        raw_rows: raw.len(),
        ..Default::default()
    };

    let rows = dedupe(raw);
    report.duplicates_removed = report.raw_rows - rows.len();

    let before = rows.len();
    let rows: Vec<RawTransaction> = rows
        .into_iter()
        .filter(|r| r.product_qty < config.bulk_quantity_threshold)
        .collect();
    report.bulk_outliers_removed = before - rows.len();

    report.missing_dates = missing_dates(rows.iter().map(|r| r.date));

    let before = rows.len();
    let rows: Vec<RawTransaction> = rows
        .into_iter()
        .filter(|r| !is_excluded(&r.product_name, &config.excluded_product_terms))
        .collect();
    report.excluded_products_removed = before - rows.len();

    let (segment_index, duplicate_keys) = index_segments(segments);
    report.duplicate_segment_keys = duplicate_keys;

    let before = rows.len();
    let purchases: Vec<PurchaseRecord> = rows
        .into_iter()
        .filter_map(|r| {
            let segment = segment_index.get(&r.customer_id)?;
            Some(PurchaseRecord {
                brand: brand(&r.product_name, &config.brand_aliases),
                pack_size_g: pack_size(&r.product_name),
                date: r.date,
                store_id: r.store_id,
                customer_id: r.customer_id,
                txn_id: r.txn_id,
                product_nbr: r.product_nbr,
                product_name: r.product_name,
                product_qty: r.product_qty,
                total_sales: r.total_sales,
                lifestage: segment.lifestage.clone(),
                premium_customer: segment.premium_customer.clone(),
            })
        })
        .collect();
    report.unmatched_customers_removed = before - purchases.len();
    report.purchases = purchases.len();

    log::info!(
        "Cleaning: {} raw -> {} purchases ({} duplicates, {} bulk, {} excluded, {} unmatched)",
        report.raw_rows,
        report.purchases,
        report.duplicates_removed,
        report.bulk_outliers_removed,
        report.excluded_products_removed,
        report.unmatched_customers_removed,
    );
    if !report.missing_dates.is_empty() {
        log::info!("Trading calendar has {} missing dates", report.missing_dates.len());
    }

    (purchases, report)
}

type RowKey = (NaiveDate, i64, i64, i64, i64, String, u32, u64);

fn row_key(r: &RawTransaction) -> RowKey {
    (
        r.date,
        r.store_id,
        r.customer_id,
        r.txn_id,
        r.product_nbr,
        r.product_name.clone(),
        r.product_qty,
        r.total_sales.to_bits(),
    )
}

/// Drop exact duplicate rows, keeping the first occurrence.
pub fn dedupe(rows: Vec<RawTransaction>) -> Vec<RawTransaction> {
    let mut seen: HashSet<RowKey> = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|r| seen.insert(row_key(r))).collect()
}

fn is_excluded(product_name: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| product_name.contains(t.as_str()))
}

/// Pack size in grams: the first run of digits in the product name.
pub fn pack_size(product_name: &str) -> Option<u32> {
    let start = product_name.find(|c: char| c.is_ascii_digit())?;
    let digits: String = product_name[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Canonical brand: the first word of the product name, through the alias table.
pub fn brand(product_name: &str, aliases: &BTreeMap<String, String>) -> String {
    let first = product_name.split_whitespace().next().unwrap_or_default();
    aliases
        .get(first)
        .cloned()
        .unwrap_or_else(|| first.to_string())
}

/// Dates in [first, last] on which no transaction occurred.
pub fn missing_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<NaiveDate> {
    let present: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let (Some(&first), Some(&last)) = (present.first(), present.last()) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| !present.contains(d))
        .collect()
}

fn index_segments(segments: &[CustomerSegment]) -> (HashMap<CustomerId, &CustomerSegment>, usize) {
    let mut index = HashMap::with_capacity(segments.len());
    let mut duplicates = 0;
    for s in segments {
        if index.contains_key(&s.customer_id) {
            duplicates += 1;
        } else {
            index.insert(s.customer_id, s);
        }
    }
    if duplicates > 0 {
        log::warn!("Segment table has {duplicates} repeated loyalty cards; first entry kept");
    }
    (index, duplicates)
}
