//! CSV loading for the transaction and customer-segment tables.
//!
//! Malformed rows are dropped and counted, never repaired. A row is
//! malformed when a required field is missing, a numeric field does not
//! parse, or the date is neither an Excel serial day nor `YYYY-MM-DD`.
//! I/O failures abort the load.

use crate::{
    error::AnalysisResult,
    record::{CustomerSegment, RawTransaction},
    types::{CustomerId, StoreId},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Rows logged individually before switching to a summary count.
const MAX_LOGGED_ROWS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl LoadReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.rows_dropped
    }

    fn drop_row(&mut self, line: usize, reason: &str) {
        self.rows_dropped += 1;
        if self.rows_dropped <= MAX_LOGGED_ROWS {
            log::debug!("Dropping row {line}: {reason}");
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(rename = "DATE")]
    date: Option<String>,
    #[serde(rename = "STORE_NBR")]
    store_nbr: Option<StoreId>,
    #[serde(rename = "LYLTY_CARD_NBR")]
    lylty_card_nbr: Option<CustomerId>,
    #[serde(rename = "TXN_ID")]
    txn_id: Option<i64>,
    #[serde(rename = "PROD_NBR")]
    prod_nbr: Option<i64>,
    #[serde(rename = "PROD_NAME")]
    prod_name: Option<String>,
    #[serde(rename = "PROD_QTY")]
    prod_qty: Option<f64>,
    #[serde(rename = "TOT_SALES")]
    tot_sales: Option<f64>,
}

impl TransactionRow {
    fn into_record(self) -> Result<RawTransaction, &'static str> {
        let date = parse_date(self.date.as_deref().ok_or("missing DATE")?)
            .ok_or("unparsable DATE")?;
        let qty = self.prod_qty.ok_or("missing PROD_QTY")?;
        if qty < 0.0 || qty.fract() != 0.0 || qty > u32::MAX as f64 {
            return Err("PROD_QTY is not a whole pack count");
        }
        let total_sales = self.tot_sales.ok_or("missing TOT_SALES")?;
        if !total_sales.is_finite() {
            return Err("TOT_SALES is not finite");
        }
        Ok(RawTransaction {
            date,
            store_id: self.store_nbr.ok_or("missing STORE_NBR")?,
            customer_id: self.lylty_card_nbr.ok_or("missing LYLTY_CARD_NBR")?,
            txn_id: self.txn_id.ok_or("missing TXN_ID")?,
            product_nbr: self.prod_nbr.ok_or("missing PROD_NBR")?,
            product_name: self
                .prod_name
                .filter(|n| !n.trim().is_empty())
                .ok_or("missing PROD_NAME")?,
            product_qty: qty as u32,
            total_sales,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SegmentRow {
    #[serde(rename = "LYLTY_CARD_NBR")]
    lylty_card_nbr: Option<CustomerId>,
    #[serde(rename = "LIFESTAGE")]
    lifestage: Option<String>,
    #[serde(rename = "PREMIUM_CUSTOMER")]
    premium_customer: Option<String>,
}

impl SegmentRow {
    fn into_record(self) -> Result<CustomerSegment, &'static str> {
        Ok(CustomerSegment {
            customer_id: self.lylty_card_nbr.ok_or("missing LYLTY_CARD_NBR")?,
            lifestage: self
                .lifestage
                .filter(|s| !s.is_empty())
                .ok_or("missing LIFESTAGE")?,
            premium_customer: self
                .premium_customer
                .filter(|s| !s.is_empty())
                .ok_or("missing PREMIUM_CUSTOMER")?,
        })
    }
}

/// Excel serial day (1900 date system, origin 1899-12-30) or ISO date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(serial) = value.parse::<f64>() {
        if serial.fract() != 0.0 || !(1.0..=2_958_465.0).contains(&serial) {
            return None;
        }
        let origin = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return origin.checked_add_signed(Duration::days(serial as i64));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn read_rows<R, Row, T>(
    reader: R,
    convert: impl Fn(Row) -> Result<T, &'static str>,
    table: &str,
) -> AnalysisResult<(Vec<T>, LoadReport)>
where
    R: Read,
    Row: serde::de::DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (i, row) in csv_reader.deserialize::<Row>().enumerate() {
        let line = i + 2; // 1-based, after the header
        report.rows_read += 1;
        match row {
            Ok(row) => match convert(row) {
                Ok(record) => records.push(record),
                Err(reason) => report.drop_row(line, reason),
            },
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => report.drop_row(line, &e.to_string()),
        }
    }

    if report.rows_dropped > 0 {
        log::warn!(
            "{table}: dropped {} of {} rows as malformed",
            report.rows_dropped,
            report.rows_read
        );
    }
    log::info!("{table}: loaded {} rows", records.len());
    Ok((records, report))
}

pub fn read_transactions<R: Read>(reader: R) -> AnalysisResult<(Vec<RawTransaction>, LoadReport)> {
    read_rows(reader, TransactionRow::into_record, "transactions")
}

pub fn read_segments<R: Read>(reader: R) -> AnalysisResult<(Vec<CustomerSegment>, LoadReport)> {
    read_rows(reader, SegmentRow::into_record, "segments")
}

pub fn load_transactions(path: impl AsRef<Path>) -> AnalysisResult<(Vec<RawTransaction>, LoadReport)> {
    read_transactions(File::open(path)?)
}

pub fn load_segments(path: impl AsRef<Path>) -> AnalysisResult<(Vec<CustomerSegment>, LoadReport)> {
    read_segments(File::open(path)?)
}
