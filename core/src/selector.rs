//! Control store selector — similarity search over the candidate pool.
//!
//! For a trial store, every candidate store's monthly series is scored
//! against the trial store's series on one metric. The candidate with
//! the highest Pearson correlation becomes the control.
//!
//! RULES:
//!   - Trial stores never enter the pool. No store controls itself.
//!   - Candidates whose series length differs from the trial series are
//!     skipped (eligibility gate).
//!   - Ties go to the candidate earlier in pool order. The pool is kept
//!     ascending by store id, so results are reproducible.
//!
//! KNOWN LIMITATION: the gate compares lengths only. A candidate trading
//! the same number of months but a different set of months passes it.
//! With `SeriesAlignment::Positional` such a candidate is correlated
//! month-against-wrong-month.

use crate::{
    error::{AnalysisError, AnalysisResult},
    metrics::{calculate_metrics_from, Metric, MetricSeries},
    record::TransactionRecord,
    stats,
    types::StoreId,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// How two independently built series are paired for correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesAlignment {
    /// Pair rows by index. Assumes both series list the same months.
    Positional,
    /// Pair rows by month key; months on one side only are ignored.
    #[default]
    Month,
}

impl SeriesAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positional => "positional",
            Self::Month      => "month",
        }
    }

    /// Metric values of `a` and `b` paired according to this alignment.
    pub fn pair(&self, a: &MetricSeries, b: &MetricSeries, metric: Metric) -> Vec<(f64, f64)> {
        match self {
            Self::Positional => a
                .rows()
                .iter()
                .zip(b.rows())
                .map(|(x, y)| (x.value(metric), y.value(metric)))
                .collect(),
            Self::Month => a
                .rows()
                .iter()
                .filter_map(|x| b.get(x.month).map(|y| (x.value(metric), y.value(metric))))
                .collect(),
        }
    }
}

impl fmt::Display for SeriesAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesAlignment {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "positional" => Ok(Self::Positional),
            "month"      => Ok(Self::Month),
            other => Err(AnalysisError::UnknownAlignment { name: other.to_string() }),
        }
    }
}

/// Candidate control stores: ascending, de-duplicated, trial stores removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    stores: Vec<StoreId>,
}

impl CandidatePool {
    pub fn new(all_stores: &[StoreId], trial_stores: &[StoreId]) -> Self {
        let excluded: BTreeSet<StoreId> = trial_stores.iter().copied().collect();
        let stores: BTreeSet<StoreId> = all_stores
            .iter()
            .copied()
            .filter(|s| !excluded.contains(s))
            .collect();
        Self { stores: stores.into_iter().collect() }
    }

    pub fn stores(&self) -> &[StoreId] {
        &self.stores
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// How one candidate fared against the trial store.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Eligible { correlation: f64 },
    /// Series length differs from the trial series.
    LengthMismatch { candidate_len: usize, trial_len: usize },
    /// Correlation undefined (too few pairs or zero variance).
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub store_id: StoreId,
    pub outcome: CandidateOutcome,
}

/// The selected control for one trial store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMatch {
    pub store_id: StoreId,
    pub correlation: f64,
}

/// Transaction records grouped by store, so each candidate series is
/// built from its own rows rather than a scan of the full record set.
pub struct StoreIndex<'a> {
    by_store: HashMap<StoreId, Vec<&'a TransactionRecord>>,
}

impl<'a> StoreIndex<'a> {
    pub fn new(records: &'a [TransactionRecord]) -> Self {
        let mut by_store: HashMap<StoreId, Vec<&'a TransactionRecord>> = HashMap::new();
        for record in records {
            by_store.entry(record.store_id).or_default().push(record);
        }
        Self { by_store }
    }

    pub fn series(&self, store: StoreId) -> AnalysisResult<MetricSeries> {
        match self.by_store.get(&store) {
            Some(rows) => calculate_metrics_from(rows.iter().copied()),
            None => Ok(MetricSeries::default()),
        }
    }

    pub fn stores(&self) -> Vec<StoreId> {
        let mut stores: Vec<StoreId> = self.by_store.keys().copied().collect();
        stores.sort_unstable();
        stores
    }
}

pub struct ControlSelector<'a> {
    index: &'a StoreIndex<'a>,
    alignment: SeriesAlignment,
}

impl<'a> ControlSelector<'a> {
    pub fn new(index: &'a StoreIndex<'a>, alignment: SeriesAlignment) -> Self {
        Self { index, alignment }
    }

    /// Score every candidate against `trial_store`, in pool order.
    /// Candidates are scored in parallel; output order is the pool order.
    pub fn score_candidates(
        &self,
        trial_store: StoreId,
        pool: &CandidatePool,
        metric: Metric,
    ) -> AnalysisResult<Vec<CandidateScore>> {
        let trial = self.index.series(trial_store)?;
        pool.stores()
            .par_iter()
            .filter(|&&candidate| candidate != trial_store)
            .map(|&candidate| -> AnalysisResult<CandidateScore> {
                let series = self.index.series(candidate)?;
                Ok(CandidateScore {
                    store_id: candidate,
                    outcome: self.score(&trial, &series, metric),
                })
            })
            .collect()
    }

    /// The best-correlated eligible candidate, or `None` when no
    /// candidate is eligible.
    pub fn select(
        &self,
        trial_store: StoreId,
        pool: &CandidatePool,
        metric: Metric,
    ) -> AnalysisResult<Option<ControlMatch>> {
        let scores = self.score_candidates(trial_store, pool, metric)?;
        for s in &scores {
            log::debug!("trial {trial_store} vs candidate {}: {:?}", s.store_id, s.outcome);
        }
        Ok(best_candidate(&scores))
    }

    fn score(&self, trial: &MetricSeries, candidate: &MetricSeries, metric: Metric) -> CandidateOutcome {
        if candidate.len() != trial.len() {
            return CandidateOutcome::LengthMismatch {
                candidate_len: candidate.len(),
                trial_len: trial.len(),
            };
        }
        let pairs = self.alignment.pair(trial, candidate, metric);
        match stats::pearson(&pairs) {
            Some(correlation) => CandidateOutcome::Eligible { correlation },
            None => CandidateOutcome::Undefined,
        }
    }
}

/// Fold scores in order, keeping the first strictly-greatest correlation.
pub fn best_candidate(scores: &[CandidateScore]) -> Option<ControlMatch> {
    scores.iter().fold(None, |best: Option<ControlMatch>, score| {
        let CandidateOutcome::Eligible { correlation } = score.outcome else {
            return best;
        };
        match best {
            Some(b) if correlation <= b.correlation => Some(b),
            _ => Some(ControlMatch { store_id: score.store_id, correlation }),
        }
    })
}

/// Select the control for `trial_store` directly from a record set.
pub fn find_control_store(
    records: &[TransactionRecord],
    trial_store: StoreId,
    pool: &CandidatePool,
    metric: Metric,
    alignment: SeriesAlignment,
) -> AnalysisResult<Option<ControlMatch>> {
    let index = StoreIndex::new(records);
    ControlSelector::new(&index, alignment).select(trial_store, pool, metric)
}
