//! The analysis event log.
//!
//! RULE: Every pipeline stage records what it decided as an event.
//! Events are appended in a fixed order, so two runs over the same
//! records and configuration produce identical logs.

use crate::{
    metrics::Metric,
    selector::SeriesAlignment,
    types::{RunId, StoreId},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants are append-only. Never remove or reorder them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    // ── Run lifecycle ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        trial_stores: Vec<StoreId>,
        selection_metric: Metric,
        alignment: SeriesAlignment,
        records: usize,
    },
    RunCompleted {
        matched: usize,
        unmatched: usize,
    },

    // ── Control selection ──────────────────────────
    CandidatePoolBuilt {
        candidates: usize,
    },
    ControlSelected {
        trial_store: StoreId,
        control_store: StoreId,
        correlation: f64,
        eligible_candidates: usize,
    },
    ControlUnmatched {
        trial_store: StoreId,
        length_mismatches: usize,
        undefined_correlations: usize,
    },

    // ── Trial evaluation ───────────────────────────
    ComparisonBuilt {
        trial_store: StoreId,
        control_store: StoreId,
        joined_months: usize,
        dropped_trial_months: usize,
        dropped_control_months: usize,
    },
    VerdictComputed {
        trial_store: StoreId,
        metric: Metric,
        outcome: String,
        statistic: Option<f64>,
        p_value: Option<f64>,
    },
}

impl AnalysisEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }     => "run_initialized",
            Self::RunCompleted { .. }       => "run_completed",
            Self::CandidatePoolBuilt { .. } => "candidate_pool_built",
            Self::ControlSelected { .. }    => "control_selected",
            Self::ControlUnmatched { .. }   => "control_unmatched",
            Self::ComparisonBuilt { .. }    => "comparison_built",
            Self::VerdictComputed { .. }    => "verdict_computed",
        }
    }

    /// Pipeline stage that emits this event.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } | Self::RunCompleted { .. } => "engine",
            Self::CandidatePoolBuilt { .. }
            | Self::ControlSelected { .. }
            | Self::ControlUnmatched { .. } => "selector",
            Self::ComparisonBuilt { .. } | Self::VerdictComputed { .. } => "evaluator",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub seq: u64,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized AnalysisEvent
}
