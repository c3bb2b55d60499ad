//! Reporting: the verdict report, CSV exports and the JSON run report.
//!
//! The significance level is applied here, for display only.

use crate::{
    error::AnalysisResult,
    evaluator::TrialEvaluation,
    metrics::Metric,
    selector::{ControlMatch, SeriesAlignment},
    stats::TestOutcome,
    types::{RunId, StoreId},
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlAssignment {
    pub trial_store: StoreId,
    /// `None` when no candidate passed the eligibility gate.
    pub control: Option<ControlMatch>,
}

impl ControlAssignment {
    pub fn is_matched(&self) -> bool {
        self.control.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub run_id: RunId,
    pub selection_metric: Metric,
    pub alignment: SeriesAlignment,
    pub assignments: Vec<ControlAssignment>,
    pub evaluations: Vec<TrialEvaluation>,
}

impl TrialReport {
    pub fn matched_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_matched()).count()
    }

    pub fn control_for(&self, trial_store: StoreId) -> Option<StoreId> {
        self.assignments
            .iter()
            .find(|a| a.trial_store == trial_store)
            .and_then(|a| a.control.as_ref())
            .map(|c| c.store_id)
    }

    pub fn evaluation(&self, trial_store: StoreId) -> Option<&TrialEvaluation> {
        self.evaluations.iter().find(|e| e.trial_store == trial_store)
    }
}

/// Human-readable verdicts, one block per trial store.
pub fn format_verdicts(report: &TrialReport, significance_level: f64) -> String {
    let mut out = String::new();
    for assignment in &report.assignments {
        let _ = writeln!(out, "Trial Store {}", assignment.trial_store);
        let Some(control) = &assignment.control else {
            let _ = writeln!(out, "  No eligible control store found");
            continue;
        };
        let _ = writeln!(
            out,
            "  Control Store {} (correlation on {} = {:.4})",
            control.store_id, report.selection_metric, control.correlation
        );
        let Some(evaluation) = report.evaluation(assignment.trial_store) else {
            continue;
        };
        for verdict in &evaluation.verdicts {
            let label = verdict.metric.label();
            match &verdict.outcome {
                TestOutcome::Computed { statistic, p_value, .. } => {
                    let flag = if *p_value < significance_level { "  *significant*" } else { "" };
                    let _ = writeln!(
                        out,
                        "  {label} Difference: t-statistic = {statistic:.2}, p-value = {p_value:.10}{flag}"
                    );
                }
                TestOutcome::InsufficientData { observations } => {
                    let _ = writeln!(
                        out,
                        "  {label} Difference: insufficient data ({observations} paired months)"
                    );
                }
                TestOutcome::ZeroVariance { mean_difference } => {
                    let _ = writeln!(
                        out,
                        "  {label} Difference: constant difference of {mean_difference:.2}, no variance to test"
                    );
                }
            }
        }
    }
    out
}

#[derive(Serialize)]
struct ComparisonCsvRow {
    trial_store: StoreId,
    control_store: StoreId,
    month: String,
    total_sales_trial: f64,
    total_sales_control: f64,
    total_customers_trial: u64,
    total_customers_control: u64,
    avg_transactions_trial: f64,
    avg_transactions_control: f64,
    sales_diff: f64,
    customers_diff: f64,
    transactions_diff: f64,
}

#[derive(Serialize)]
struct DifferenceCsvRow {
    trial_store: StoreId,
    month: String,
    metric: &'static str,
    difference: f64,
}

/// Comparison table: trial and control values plus differences.
pub fn write_comparison_csv<W: Write>(writer: W, report: &TrialReport) -> AnalysisResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in report.evaluations.iter().flat_map(|e| &e.comparison) {
        csv_writer.serialize(ComparisonCsvRow {
            trial_store: row.trial_store,
            control_store: row.control_store,
            month: row.month.to_string(),
            total_sales_trial: row.trial.total_sales,
            total_sales_control: row.control.total_sales,
            total_customers_trial: row.trial.total_customers,
            total_customers_control: row.control.total_customers,
            avg_transactions_trial: row.trial.avg_transactions,
            avg_transactions_control: row.control.avg_transactions,
            sales_diff: row.difference(Metric::TotalSales),
            customers_diff: row.difference(Metric::TotalCustomers),
            transactions_diff: row.difference(Metric::AvgTransactions),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Long-form trial − control series, one row per (store, month, metric).
pub fn write_differences_csv<W: Write>(writer: W, report: &TrialReport) -> AnalysisResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for metric in Metric::ALL {
        for row in report.evaluations.iter().flat_map(|e| &e.comparison) {
            csv_writer.serialize(DifferenceCsvRow {
                trial_store: row.trial_store,
                month: row.month.to_string(),
                metric: metric.as_str(),
                difference: row.difference(metric),
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `comparison.csv` and `differences.csv` into `out_dir`.
pub fn export_csv(out_dir: impl AsRef<Path>, report: &TrialReport) -> AnalysisResult<()> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;
    write_comparison_csv(File::create(out_dir.join("comparison.csv"))?, report)?;
    write_differences_csv(File::create(out_dir.join("differences.csv"))?, report)?;
    log::info!("Exported comparison and difference tables to {}", out_dir.display());
    Ok(())
}
