//! The trial engine — runs the whole trial analysis for one run.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Candidate pool built (all stores minus trial stores)
//!   2. For each trial store, in configured order:
//!        a. Control selection
//!        b. Trial evaluation (matched trial stores only)
//!   3. Report persisted
//!
//! RULES:
//!   - Data flows forward only. No stage reads its own prior output.
//!   - An unmatched trial store is recorded and the run continues.
//!   - Every decision is recorded in the event log.

use crate::{
    config::TrialConfig,
    error::{AnalysisError, AnalysisResult},
    evaluator::{evaluate_trial, TrialEvaluation},
    event::{AnalysisEvent, EventLogEntry},
    record::TransactionRecord,
    report::{ControlAssignment, TrialReport},
    selector::{best_candidate, CandidateOutcome, CandidatePool, ControlSelector, StoreIndex},
    store::AnalysisStore,
    types::{RunId, StoreId},
};
use std::collections::BTreeSet;

pub struct TrialEngine {
    pub run_id: RunId,
    pub config: TrialConfig,
    store: AnalysisStore,
    seq: u64,
}

impl TrialEngine {
    pub fn new(run_id: RunId, config: TrialConfig, store: AnalysisStore) -> Self {
        Self {
            run_id,
            config,
            store,
            seq: 0,
        }
    }

    /// Register the run in the ledger and return a ready engine.
    pub fn build(run_id: RunId, config: TrialConfig, store: AnalysisStore) -> AnalysisResult<Self> {
        let config_json = serde_json::to_string(&config)?;
        store.insert_run(&run_id, env!("CARGO_PKG_VERSION"), &config_json)?;
        Ok(Self::new(run_id, config, store))
    }

    /// In-memory, migrated engine with the test configuration.
    pub fn build_test(run_id: RunId) -> AnalysisResult<Self> {
        Self::build_test_with(run_id, TrialConfig::default_test())
    }

    pub fn build_test_with(run_id: RunId, config: TrialConfig) -> AnalysisResult<Self> {
        let store = AnalysisStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id, config, store)
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    /// Run the full trial analysis over `records`.
    pub fn run(&mut self, records: &[TransactionRecord]) -> AnalysisResult<TrialReport> {
        let mut seen = BTreeSet::new();
        let trial_stores: Vec<StoreId> = self
            .config
            .trial_stores
            .iter()
            .copied()
            .filter(|s| seen.insert(*s))
            .collect();
        if trial_stores.len() < self.config.trial_stores.len() {
            log::warn!(
                "Ignoring repeated trial stores in {:?}; each is analysed once",
                self.config.trial_stores
            );
        }
        if trial_stores.is_empty() {
            return Err(AnalysisError::NoTrialStores);
        }
        let metric = self.config.selection_metric;
        let alignment = self.config.alignment;

        self.record(AnalysisEvent::RunInitialized {
            run_id: self.run_id.clone(),
            trial_stores: trial_stores.clone(),
            selection_metric: metric,
            alignment,
            records: records.len(),
        })?;

        let index = StoreIndex::new(records);
        let pool = CandidatePool::new(&index.stores(), &trial_stores);
        log::info!(
            "Run {}: {} trial stores, {} candidate controls, selecting on {metric} ({alignment} alignment)",
            self.run_id,
            trial_stores.len(),
            pool.len()
        );
        self.record(AnalysisEvent::CandidatePoolBuilt { candidates: pool.len() })?;

        let selector = ControlSelector::new(&index, alignment);
        let mut assignments = Vec::with_capacity(trial_stores.len());
        let mut evaluations = Vec::new();

        for &trial_store in &trial_stores {
            let scores = selector.score_candidates(trial_store, &pool, metric)?;
            match best_candidate(&scores) {
                Some(control) => {
                    let eligible = scores
                        .iter()
                        .filter(|s| matches!(s.outcome, CandidateOutcome::Eligible { .. }))
                        .count();
                    log::info!(
                        "Trial store {trial_store}: control {} (r = {:.4})",
                        control.store_id,
                        control.correlation
                    );
                    self.record(AnalysisEvent::ControlSelected {
                        trial_store,
                        control_store: control.store_id,
                        correlation: control.correlation,
                        eligible_candidates: eligible,
                    })?;
                    self.store.insert_assignment(
                        &self.run_id,
                        trial_store,
                        Some((control.store_id, control.correlation)),
                    )?;

                    let evaluation = self.evaluate(&index, trial_store, control.store_id)?;
                    evaluations.push(evaluation);
                    assignments.push(ControlAssignment { trial_store, control: Some(control) });
                }
                None => {
                    let length_mismatches = scores
                        .iter()
                        .filter(|s| matches!(s.outcome, CandidateOutcome::LengthMismatch { .. }))
                        .count();
                    let undefined_correlations = scores
                        .iter()
                        .filter(|s| s.outcome == CandidateOutcome::Undefined)
                        .count();
                    log::warn!(
                        "Trial store {trial_store}: no eligible control \
                         ({length_mismatches} length mismatches, {undefined_correlations} undefined)"
                    );
                    self.record(AnalysisEvent::ControlUnmatched {
                        trial_store,
                        length_mismatches,
                        undefined_correlations,
                    })?;
                    self.store.insert_assignment(&self.run_id, trial_store, None)?;
                    assignments.push(ControlAssignment { trial_store, control: None });
                }
            }
        }

        let report = TrialReport {
            run_id: self.run_id.clone(),
            selection_metric: metric,
            alignment,
            assignments,
            evaluations,
        };

        let matched = report.matched_count();
        self.record(AnalysisEvent::RunCompleted {
            matched,
            unmatched: report.assignments.len() - matched,
        })?;
        self.store
            .save_report(&self.run_id, &serde_json::to_string(&report)?)?;
        Ok(report)
    }

    fn evaluate(
        &mut self,
        index: &StoreIndex<'_>,
        trial_store: StoreId,
        control_store: StoreId,
    ) -> AnalysisResult<TrialEvaluation> {
        let trial = index.series(trial_store)?;
        let control = index.series(control_store)?;
        let evaluation = evaluate_trial(trial_store, control_store, &trial, &control);

        self.record(AnalysisEvent::ComparisonBuilt {
            trial_store,
            control_store,
            joined_months: evaluation.comparison.len(),
            dropped_trial_months: evaluation.dropped_trial_months,
            dropped_control_months: evaluation.dropped_control_months,
        })?;
        for row in &evaluation.comparison {
            self.store.insert_comparison_row(&self.run_id, row)?;
        }

        for verdict in &evaluation.verdicts {
            self.record(AnalysisEvent::VerdictComputed {
                trial_store,
                metric: verdict.metric,
                outcome: verdict.outcome.kind().to_string(),
                statistic: verdict.outcome.statistic(),
                p_value: verdict.outcome.p_value(),
            })?;
            self.store.insert_verdict(&self.run_id, verdict)?;
        }
        Ok(evaluation)
    }

    fn record(&mut self, event: AnalysisEvent) -> AnalysisResult<()> {
        let entry = EventLogEntry {
            id: None,
            run_id: self.run_id.clone(),
            seq: self.seq,
            stage: event.stage().to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)?;
        self.seq += 1;
        Ok(())
    }
}
