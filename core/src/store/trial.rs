use super::AnalysisStore;
use crate::{
    error::AnalysisResult,
    evaluator::{ComparisonRow, Verdict},
    stats::TestOutcome,
    types::StoreId,
};
use rusqlite::{params, OptionalExtension};

/// A control assignment as read back from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRow {
    pub trial_store: StoreId,
    pub control_store: Option<StoreId>,
    pub correlation: Option<f64>,
}

/// A verdict as read back from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictRow {
    pub trial_store: StoreId,
    pub metric: String,
    pub outcome: String,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
}

impl AnalysisStore {
    // ── Control assignment ─────────────────────────────────────

    pub fn insert_assignment(
        &self,
        run_id: &str,
        trial_store: StoreId,
        control: Option<(StoreId, f64)>,
    ) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT INTO control_assignment (run_id, trial_store, control_store, correlation)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                trial_store,
                control.map(|c| c.0),
                control.map(|c| c.1),
            ],
        )?;
        Ok(())
    }

    pub fn assignments_for_run(&self, run_id: &str) -> AnalysisResult<Vec<AssignmentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT trial_store, control_store, correlation
             FROM control_assignment WHERE run_id = ?1
             ORDER BY trial_store ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(AssignmentRow {
                    trial_store: row.get(0)?,
                    control_store: row.get(1)?,
                    correlation: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Comparison rows ────────────────────────────────────────

    pub fn insert_comparison_row(&self, run_id: &str, r: &ComparisonRow) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT INTO comparison_row (
                run_id, trial_store, control_store, month,
                trial_total_sales, control_total_sales,
                trial_total_customers, control_total_customers,
                trial_avg_transactions, control_avg_transactions
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                r.trial_store,
                r.control_store,
                r.month.to_string(),
                r.trial.total_sales,
                r.control.total_sales,
                r.trial.total_customers as i64,
                r.control.total_customers as i64,
                r.trial.avg_transactions,
                r.control.avg_transactions,
            ],
        )?;
        Ok(())
    }

    pub fn comparison_row_count(&self, run_id: &str, trial_store: StoreId) -> AnalysisResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comparison_row WHERE run_id = ?1 AND trial_store = ?2",
            params![run_id, trial_store],
            |row| row.get(0),
        )?)
    }

    // ── Verdicts ───────────────────────────────────────────────

    pub fn insert_verdict(&self, run_id: &str, v: &Verdict) -> AnalysisResult<()> {
        let (statistic, p_value, df, mean_difference, observations) = match &v.outcome {
            TestOutcome::Computed {
                statistic,
                p_value,
                degrees_of_freedom,
                mean_difference,
            } => (Some(*statistic), Some(*p_value), Some(*degrees_of_freedom), Some(*mean_difference), None),
            TestOutcome::InsufficientData { observations } => {
                (None, None, None, None, Some(*observations as i64))
            }
            TestOutcome::ZeroVariance { mean_difference } => {
                (None, None, None, Some(*mean_difference), None)
            }
        };
        self.conn.execute(
            "INSERT INTO verdict (
                run_id, trial_store, metric, outcome, statistic, p_value,
                degrees_of_freedom, mean_difference, observations
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                v.trial_store,
                v.metric.as_str(),
                v.outcome.kind(),
                statistic,
                p_value,
                df,
                mean_difference,
                observations,
            ],
        )?;
        Ok(())
    }

    pub fn verdicts_for_run(&self, run_id: &str) -> AnalysisResult<Vec<VerdictRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT trial_store, metric, outcome, statistic, p_value
             FROM verdict WHERE run_id = ?1
             ORDER BY trial_store ASC, metric ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(VerdictRow {
                    trial_store: row.get(0)?,
                    metric: row.get(1)?,
                    outcome: row.get(2)?,
                    statistic: row.get(3)?,
                    p_value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Report ─────────────────────────────────────────────────

    pub fn save_report(&self, run_id: &str, report_json: &str) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT INTO run_report (run_id, report_json) VALUES (?1, ?2)",
            params![run_id, report_json],
        )?;
        Ok(())
    }

    pub fn load_report(&self, run_id: &str) -> AnalysisResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT report_json FROM run_report WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}
