//! Customer segment comparison.
//!
//! A segment is a (lifestage, premium_customer) pair, e.g.
//! ("YOUNG SINGLES/COUPLES", "Mainstream").

use crate::{
    record::PurchaseRecord,
    stats::{self, TestOutcome},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentKey {
    pub lifestage: String,
    pub premium_customer: String,
}

impl SegmentKey {
    pub fn new(lifestage: impl Into<String>, premium_customer: impl Into<String>) -> Self {
        Self {
            lifestage: lifestage.into(),
            premium_customer: premium_customer.into(),
        }
    }

    pub fn matches(&self, p: &PurchaseRecord) -> bool {
        p.lifestage == self.lifestage && p.premium_customer == self.premium_customer
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentComparison {
    pub a: SegmentKey,
    pub b: SegmentKey,
    pub a_count: usize,
    pub b_count: usize,
    pub a_mean_quantity: Option<f64>,
    pub b_mean_quantity: Option<f64>,
    pub outcome: TestOutcome,
}

fn quantities(purchases: &[PurchaseRecord], key: &SegmentKey) -> Vec<f64> {
    purchases
        .iter()
        .filter(|p| key.matches(p))
        .map(|p| p.product_qty as f64)
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Welch t-test on packs per purchase between two segments.
pub fn compare_quantity(purchases: &[PurchaseRecord], a: &SegmentKey, b: &SegmentKey) -> SegmentComparison {
    let qa = quantities(purchases, a);
    let qb = quantities(purchases, b);
    SegmentComparison {
        a: a.clone(),
        b: b.clone(),
        a_count: qa.len(),
        b_count: qb.len(),
        a_mean_quantity: mean(&qa),
        b_mean_quantity: mean(&qb),
        outcome: stats::welch_t_test(&qa, &qb),
    }
}
