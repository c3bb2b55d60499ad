//! Trial evaluator — paired comparison of a trial store and its control.
//!
//! The two monthly series are inner-joined on month. Months present on
//! one side only are dropped and counted. Each metric then gets a paired
//! two-sided t-test over the joined months.
//!
//! The evaluator emits numbers only. Significance thresholds belong to
//! the report layer.

use crate::{
    metrics::{Metric, MetricSeries, MonthlyMetric},
    month::Month,
    stats::{self, TestOutcome},
    types::StoreId,
};
use serde::{Deserialize, Serialize};

/// Trial and control values for one joined month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub trial_store: StoreId,
    pub control_store: StoreId,
    pub month: Month,
    pub trial: MonthlyMetric,
    pub control: MonthlyMetric,
}

impl ComparisonRow {
    pub fn trial_value(&self, metric: Metric) -> f64 {
        self.trial.value(metric)
    }

    pub fn control_value(&self, metric: Metric) -> f64 {
        self.control.value(metric)
    }

    /// trial − control.
    pub fn difference(&self, metric: Metric) -> f64 {
        self.trial_value(metric) - self.control_value(metric)
    }
}

/// Paired-test result for one (trial store, metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub trial_store: StoreId,
    pub metric: Metric,
    pub outcome: TestOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEvaluation {
    pub trial_store: StoreId,
    pub control_store: StoreId,
    pub comparison: Vec<ComparisonRow>,
    /// Months only the trial store traded.
    pub dropped_trial_months: usize,
    /// Months only the control store traded.
    pub dropped_control_months: usize,
    pub verdicts: Vec<Verdict>,
}

impl TrialEvaluation {
    pub fn verdict(&self, metric: Metric) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.metric == metric)
    }

    pub fn months(&self) -> Vec<Month> {
        self.comparison.iter().map(|r| r.month).collect()
    }
}

/// Inner-join two series on month, ascending.
pub fn join_by_month(
    trial_store: StoreId,
    control_store: StoreId,
    trial: &MetricSeries,
    control: &MetricSeries,
) -> Vec<ComparisonRow> {
    trial
        .rows()
        .iter()
        .filter_map(|t| {
            control.get(t.month).map(|c| ComparisonRow {
                trial_store,
                control_store,
                month: t.month,
                trial: t.clone(),
                control: c.clone(),
            })
        })
        .collect()
}

/// Paired test of trial against control on one metric.
pub fn test_metric(trial_store: StoreId, rows: &[ComparisonRow], metric: Metric) -> Verdict {
    let pairs: Vec<(f64, f64)> = rows
        .iter()
        .map(|r| (r.trial_value(metric), r.control_value(metric)))
        .collect();
    Verdict {
        trial_store,
        metric,
        outcome: stats::paired_t_test(&pairs),
    }
}

/// Join the series and test every metric.
pub fn evaluate_trial(
    trial_store: StoreId,
    control_store: StoreId,
    trial: &MetricSeries,
    control: &MetricSeries,
) -> TrialEvaluation {
    let comparison = join_by_month(trial_store, control_store, trial, control);
    let dropped_trial_months = trial.len() - comparison.len();
    let dropped_control_months = control.len() - comparison.len();
    if dropped_trial_months + dropped_control_months > 0 {
        log::info!(
            "Trial {trial_store} / control {control_store}: dropped {dropped_trial_months} \
             trial-only and {dropped_control_months} control-only months"
        );
    }

    let verdicts = Metric::ALL
        .iter()
        .map(|&metric| test_metric(trial_store, &comparison, metric))
        .collect();

    TrialEvaluation {
        trial_store,
        control_store,
        comparison,
        dropped_trial_months,
        dropped_control_months,
        verdicts,
    }
}
