//! Deterministic random number generation for synthetic data.
//!
//! RULE: Nothing in the crate may call any platform RNG.
//! All randomness flows through StoreRng instances derived from a
//! single master seed.
//!
//! Each store gets its own RNG stream, seeded from
//! (master_seed XOR mixed store id). This means:
//!   - Adding a store never changes existing stores' data.
//!   - Each store's data is reproducible in isolation.

use crate::types::StoreId;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG stream for a single store.
pub struct StoreRng {
    pub store_id: StoreId,
    inner: Pcg64Mcg,
}

impl StoreRng {
    pub fn new(master_seed: u64, store_id: StoreId) -> Self {
        let derived_seed = master_seed ^ (store_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            store_id,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Source of per-store RNG streams for one dataset.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_store(&self, store_id: StoreId) -> StoreRng {
        StoreRng::new(self.master_seed, store_id)
    }
}
