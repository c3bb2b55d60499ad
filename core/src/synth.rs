//! Synthetic chips transactions for demos and tests.
//!
//! Every store draws from its own RNG stream, so the same seed always
//! yields the same purchases. Stores share one seasonal curve; each
//! store scales it by its own base volume and monthly noise. Trial
//! stores get a multiplicative uplift from `trial_start` onwards.

use crate::{
    month::Month,
    record::PurchaseRecord,
    rng::{RngBank, StoreRng},
    types::{CustomerId, StoreId},
};
use chrono::NaiveDate;

const PRODUCTS: [(i64, &str, f64); 6] = [
    (1, "Smiths Crinkle Cut  Chips Original 330g", 5.70),
    (2, "Doritos Corn Chips  Cheese Supreme 170g", 4.40),
    (3, "Kettle Sensations   Camembert & Fig 150g", 4.60),
    (4, "Natural Chip        Compny SeaSalt175g", 3.00),
    (5, "RRD Sweet Chilli &  Sour Cream 165g", 3.00),
    (6, "WW Original Stacked Chips 160g", 1.90),
];

const LIFESTAGES: [&str; 7] = [
    "YOUNG SINGLES/COUPLES",
    "YOUNG FAMILIES",
    "MIDAGE SINGLES/COUPLES",
    "OLDER FAMILIES",
    "OLDER SINGLES/COUPLES",
    "RETIREES",
    "NEW FAMILIES",
];

const PREMIUM: [&str; 3] = ["Budget", "Mainstream", "Premium"];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub stores: Vec<StoreId>,
    pub first_month: Month,
    pub months: u32,
    pub customers_per_store: u32,
    pub trial_stores: Vec<StoreId>,
    pub trial_start: Option<Month>,
    /// Sales multiplier for trial stores during the trial.
    pub uplift: f64,
    /// (store, month) pairs with no trading at all.
    pub closed: Vec<(StoreId, Month)>,
}

impl SyntheticConfig {
    /// Twelve months from July 2018 over stores 1..=40 plus the three
    /// trial stores, with a 25% uplift from February 2019.
    pub fn default_with_seed(seed: u64) -> Self {
        let mut stores: Vec<StoreId> = (1..=40).collect();
        stores.extend([77, 86, 88]);
        Self {
            seed,
            stores,
            first_month: Month::new_unchecked(2018, 7),
            months: 12,
            customers_per_store: 60,
            trial_stores: vec![77, 86, 88],
            trial_start: Some(Month::new_unchecked(2019, 2)),
            uplift: 1.25,
            closed: Vec::new(),
        }
    }
}

fn seasonal_factor(month_index: u32) -> f64 {
    1.0 + 0.15 * (month_index as f64 * std::f64::consts::PI / 6.0).sin()
}

fn customer_segment(customer_id: CustomerId) -> (&'static str, &'static str) {
    let c = customer_id.unsigned_abs() as usize;
    (LIFESTAGES[c % LIFESTAGES.len()], PREMIUM[(c / LIFESTAGES.len()) % PREMIUM.len()])
}

/// Generate purchases for every configured store and month.
pub fn generate(config: &SyntheticConfig) -> Vec<PurchaseRecord> {
    let bank = RngBank::new(config.seed);
    let mut purchases = Vec::new();
    let mut txn_id: i64 = 0;
    for &store in &config.stores {
        let mut rng = bank.for_store(store);
        generate_store(config, store, &mut rng, &mut txn_id, &mut purchases);
    }
    log::debug!("Generated {} synthetic purchases", purchases.len());
    purchases
}

fn generate_store(
    config: &SyntheticConfig,
    store: StoreId,
    rng: &mut StoreRng,
    txn_id: &mut i64,
    out: &mut Vec<PurchaseRecord>,
) {
    let base = rng.uniform(30.0, 90.0);
    let is_trial = config.trial_stores.contains(&store);
    let mut month = config.first_month;

    for month_index in 0..config.months {
        let closed = config.closed.contains(&(store, month));
        let in_trial = is_trial && config.trial_start.is_some_and(|start| month >= start);
        let uplift = if in_trial { config.uplift } else { 1.0 };
        let volume = base * seasonal_factor(month_index) * rng.uniform(0.9, 1.1) * uplift;
        let count = if closed { 0 } else { volume.round().max(1.0) as u32 };

        for _ in 0..count {
            *txn_id += 1;
            let customer_id =
                store * 1000 + rng.next_u64_below(config.customers_per_store.max(1) as u64) as i64;
            let (product_nbr, name, unit_price) =
                PRODUCTS[rng.next_u64_below(PRODUCTS.len() as u64) as usize];
            let qty = if rng.chance(0.2) { 2 } else { 1 };
            let day = 1 + rng.next_u64_below(28) as u32;
            let (lifestage, premium) = customer_segment(customer_id);
            let Some(date) = NaiveDate::from_ymd_opt(month.year(), month.month(), day) else {
                continue;
            };
            out.push(PurchaseRecord {
                date,
                store_id: store,
                customer_id,
                txn_id: *txn_id,
                product_nbr,
                product_name: name.to_string(),
                brand: name.split_whitespace().next().unwrap_or_default().to_string(),
                pack_size_g: crate::cleaning::pack_size(name),
                product_qty: qty,
                total_sales: unit_price * qty as f64,
                lifestage: lifestage.to_string(),
                premium_customer: premium.to_string(),
            });
        }
        month = month.succ();
    }
}
