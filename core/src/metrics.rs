//! Metric aggregator — monthly store-level KPIs.
//!
//! For a set of stores (one store, or several pooled as a unit) this
//! reduces transaction records to one row per trading month:
//!   - total sales
//!   - distinct customers
//!   - average transactions per customer
//!
//! Months without transactions produce no row. There is no zero-fill.

use crate::{
    error::{AnalysisError, AnalysisResult},
    month::Month,
    record::TransactionRecord,
    types::{CustomerId, StoreId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// The three KPIs tracked for every store-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[serde(alias = "sales")]
    TotalSales,
    #[serde(alias = "total_cust")]
    TotalCustomers,
    #[serde(alias = "avg_trans")]
    AvgTransactions,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::TotalSales,
        Metric::TotalCustomers,
        Metric::AvgTransactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalSales      => "total_sales",
            Self::TotalCustomers  => "total_customers",
            Self::AvgTransactions => "avg_transactions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalSales      => "Sales",
            Self::TotalCustomers  => "Customers",
            Self::AvgTransactions => "Transactions per customer",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "total_sales" | "sales"                => Ok(Self::TotalSales),
            "total_customers" | "total_cust"       => Ok(Self::TotalCustomers),
            "avg_transactions" | "avg_trans"       => Ok(Self::AvgTransactions),
            other => Err(AnalysisError::UnknownMetric { name: other.to_string() }),
        }
    }
}

/// One month of KPIs for a store set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetric {
    pub month: Month,
    pub total_sales: f64,
    pub total_customers: u64,
    pub transaction_count: u64,
    pub avg_transactions: f64,
}

impl MonthlyMetric {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::TotalSales      => self.total_sales,
            Metric::TotalCustomers  => self.total_customers as f64,
            Metric::AvgTransactions => self.avg_transactions,
        }
    }
}

/// Month-ordered KPI rows. Months are strictly ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    rows: Vec<MonthlyMetric>,
}

impl MetricSeries {
    pub fn rows(&self) -> &[MonthlyMetric] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn months(&self) -> Vec<Month> {
        self.rows.iter().map(|r| r.month).collect()
    }

    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|r| r.value(metric)).collect()
    }

    pub fn get(&self, month: Month) -> Option<&MonthlyMetric> {
        self.rows
            .binary_search_by(|r| r.month.cmp(&month))
            .ok()
            .map(|i| &self.rows[i])
    }
}

#[derive(Default)]
struct MonthAccumulator {
    total_sales: f64,
    transaction_count: u64,
    customers: HashSet<CustomerId>,
}

impl MonthAccumulator {
    fn finish(self, month: Month) -> AnalysisResult<MonthlyMetric> {
        let total_customers = self.customers.len() as u64;
        if total_customers == 0 {
            return Err(AnalysisError::EmptyMonthGroup { month });
        }
        Ok(MonthlyMetric {
            month,
            total_sales: self.total_sales,
            total_customers,
            transaction_count: self.transaction_count,
            avg_transactions: self.transaction_count as f64 / total_customers as f64,
        })
    }
}

/// Aggregate the records belonging to any store in `stores` into a
/// monthly series, ascending by month.
pub fn calculate_metrics(
    records: &[TransactionRecord],
    stores: &[StoreId],
) -> AnalysisResult<MetricSeries> {
    let wanted: HashSet<StoreId> = stores.iter().copied().collect();
    calculate_metrics_from(records.iter().filter(|r| wanted.contains(&r.store_id)))
}

/// Aggregate every record yielded by `records`, with no store filter.
pub fn calculate_metrics_from<'a, I>(records: I) -> AnalysisResult<MetricSeries>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut by_month: BTreeMap<Month, MonthAccumulator> = BTreeMap::new();
    for record in records {
        let acc = by_month.entry(record.month).or_default();
        acc.total_sales += record.total_sales;
        acc.transaction_count += 1;
        acc.customers.insert(record.customer_id);
    }

    let rows = by_month
        .into_iter()
        .map(|(month, acc)| acc.finish(month))
        .collect::<AnalysisResult<Vec<_>>>()?;
    Ok(MetricSeries { rows })
}

/// Every distinct store appearing in `records`, ascending.
pub fn distinct_stores(records: &[TransactionRecord]) -> Vec<StoreId> {
    let mut stores: Vec<StoreId> = records.iter().map(|r| r.store_id).collect();
    stores.sort_unstable();
    stores.dedup();
    stores
}
