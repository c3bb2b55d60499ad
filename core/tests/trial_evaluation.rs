use qvi_core::{
    evaluator::{evaluate_trial, join_by_month, test_metric},
    metrics::{calculate_metrics, Metric, MetricSeries},
    month::Month,
    record::TransactionRecord,
    stats::TestOutcome,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn series(store_id: i64, months: &[&str], sales: &[f64]) -> MetricSeries {
    let records: Vec<TransactionRecord> = months
        .iter()
        .zip(sales)
        .map(|(m, &s)| TransactionRecord {
            store_id,
            customer_id: 1,
            month: m.parse().unwrap(),
            total_sales: s,
        })
        .collect();
    calculate_metrics(&records, &[store_id]).unwrap()
}

fn months(list: &[&str]) -> Vec<Month> {
    list.iter().map(|m| m.parse().unwrap()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Only months traded by both stores survive the join.
#[test]
fn join_keeps_only_shared_months() {
    let trial = series(77, &["202006", "202007", "202008"], &[1.0, 2.0, 3.0]);
    let control = series(35, &["202007", "202008", "202009"], &[4.0, 5.0, 6.0]);

    let rows = join_by_month(77, 35, &trial, &control);
    let joined: Vec<Month> = rows.iter().map(|r| r.month).collect();
    assert_eq!(joined, months(&["202007", "202008"]));
    assert!((rows[0].difference(Metric::TotalSales) - (2.0 - 4.0)).abs() < 1e-12);

    let evaluation = evaluate_trial(77, 35, &trial, &control);
    assert_eq!(evaluation.months(), months(&["202007", "202008"]));
    assert_eq!(evaluation.dropped_trial_months, 1);
    assert_eq!(evaluation.dropped_control_months, 1);
}

/// Sales differences [5, 4, 6] give a clearly significant paired test.
#[test]
fn paired_test_on_sales_differences() {
    let m = ["201902", "201903", "201904"];
    let trial = series(77, &m, &[105.0, 114.0, 111.0]);
    let control = series(35, &m, &[100.0, 110.0, 105.0]);

    let evaluation = evaluate_trial(77, 35, &trial, &control);
    let sales = evaluation.verdict(Metric::TotalSales).unwrap();
    match sales.outcome {
        TestOutcome::Computed { statistic, p_value, degrees_of_freedom, mean_difference } => {
            assert!((statistic - 8.660_254).abs() < 1e-5, "t = {statistic}");
            assert!((p_value - 0.013_072).abs() < 1e-4, "p = {p_value}");
            assert_eq!(degrees_of_freedom, 2.0);
            assert!((mean_difference - 5.0).abs() < 1e-9);
        }
        ref other => panic!("expected computed outcome, got {other:?}"),
    }

    // One customer and one transaction per month on both sides.
    let customers = evaluation.verdict(Metric::TotalCustomers).unwrap();
    assert_eq!(customers.outcome, TestOutcome::ZeroVariance { mean_difference: 0.0 });
}

/// A single joined month is reported as insufficient data for every metric.
#[test]
fn single_joined_month_is_insufficient() {
    let trial = series(77, &["201901", "201902"], &[10.0, 12.0]);
    let control = series(35, &["201902", "201903"], &[9.0, 11.0]);

    let evaluation = evaluate_trial(77, 35, &trial, &control);
    assert_eq!(evaluation.comparison.len(), 1);
    assert_eq!(evaluation.verdicts.len(), 3);
    for verdict in &evaluation.verdicts {
        assert_eq!(
            verdict.outcome,
            TestOutcome::InsufficientData { observations: 1 },
            "{}",
            verdict.metric
        );
        assert_eq!(verdict.outcome.p_value(), None);
    }
}

/// No overlap at all: empty comparison, still an explicit outcome.
#[test]
fn disjoint_series_are_insufficient() {
    let trial = series(77, &["201901"], &[10.0]);
    let control = series(35, &["201905"], &[9.0]);

    let evaluation = evaluate_trial(77, 35, &trial, &control);
    assert!(evaluation.comparison.is_empty());
    let verdict = test_metric(77, &evaluation.comparison, Metric::AvgTransactions);
    assert_eq!(verdict.outcome, TestOutcome::InsufficientData { observations: 0 });
}
