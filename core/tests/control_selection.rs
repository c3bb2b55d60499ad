use qvi_core::{
    metrics::Metric,
    record::TransactionRecord,
    selector::{
        best_candidate, find_control_store, CandidateOutcome, CandidatePool, CandidateScore,
        ControlSelector, SeriesAlignment, StoreIndex,
    },
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const MONTHS: [&str; 3] = ["201807", "201808", "201809"];

/// One single-customer transaction per month carrying the given sales.
fn store_sales(store_id: i64, months: &[&str], sales: &[f64]) -> Vec<TransactionRecord> {
    months
        .iter()
        .zip(sales)
        .map(|(m, &s)| TransactionRecord {
            store_id,
            customer_id: store_id * 100,
            month: m.parse().unwrap(),
            total_sales: s,
        })
        .collect()
}

fn dataset(parts: Vec<Vec<TransactionRecord>>) -> Vec<TransactionRecord> {
    parts.into_iter().flatten().collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Trial 77 follows store 35 closely and store 40 poorly; 35 must win.
#[test]
fn most_correlated_candidate_is_selected() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(35, &MONTHS, &[98.0, 108.0, 103.0]),
        store_sales(40, &MONTHS, &[50.0, 200.0, 10.0]),
    ]);
    let pool = CandidatePool::new(&[35, 40, 77], &[77]);

    for alignment in [SeriesAlignment::Positional, SeriesAlignment::Month] {
        let control = find_control_store(&records, 77, &pool, Metric::TotalSales, alignment)
            .unwrap()
            .expect("a control store");
        assert_eq!(control.store_id, 35, "alignment {alignment}");
        assert!((control.correlation - 1.0).abs() < 1e-9);
    }
}

/// The pool is ascending, de-duplicated and never contains trial stores.
#[test]
fn pool_excludes_trial_stores() {
    let pool = CandidatePool::new(&[88, 3, 77, 3, 1, 86], &[77, 86, 88]);
    assert_eq!(pool.stores(), &[1, 3]);
}

/// Repeated runs over the same data pick the same control.
#[test]
fn selection_is_deterministic() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(10, &MONTHS, &[20.0, 35.0, 21.0]),
        store_sales(11, &MONTHS, &[70.0, 80.0, 60.0]),
        store_sales(12, &MONTHS, &[5.0, 9.0, 8.0]),
    ]);
    let pool = CandidatePool::new(&[10, 11, 12], &[77]);
    let first = find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month)
        .unwrap();
    for _ in 0..10 {
        let again =
            find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month)
                .unwrap();
        assert_eq!(first, again);
    }
}

/// Identical correlations resolve to the earlier candidate in pool order.
#[test]
fn ties_go_to_earlier_candidate() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(52, &MONTHS, &[10.0, 30.0, 20.0]),
        store_sales(51, &MONTHS, &[10.0, 30.0, 20.0]),
    ]);
    let pool = CandidatePool::new(&[52, 51], &[77]);
    let control = find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month)
        .unwrap()
        .unwrap();
    assert_eq!(control.store_id, 51);

    // The fold itself honours the given order.
    let scores = vec![
        CandidateScore { store_id: 9, outcome: CandidateOutcome::Eligible { correlation: 0.5 } },
        CandidateScore { store_id: 4, outcome: CandidateOutcome::Eligible { correlation: 0.5 } },
    ];
    assert_eq!(best_candidate(&scores).unwrap().store_id, 9);
}

/// Candidates with a different number of trading months are gated out.
#[test]
fn length_mismatch_is_not_eligible() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(20, &MONTHS[..2], &[100.0, 110.0]),
        store_sales(21, &MONTHS, &[1.0, 3.0, 1.5]),
    ]);
    let index = StoreIndex::new(&records);
    let pool = CandidatePool::new(&index.stores(), &[77]);
    let selector = ControlSelector::new(&index, SeriesAlignment::Positional);

    let scores = selector.score_candidates(77, &pool, Metric::TotalSales).unwrap();
    assert_eq!(scores[0].store_id, 20);
    assert_eq!(
        scores[0].outcome,
        CandidateOutcome::LengthMismatch { candidate_len: 2, trial_len: 3 }
    );
    assert_eq!(selector.select(77, &pool, Metric::TotalSales).unwrap().unwrap().store_id, 21);
}

/// No eligible candidate means no match, not an error.
#[test]
fn no_match_when_every_candidate_is_gated() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(30, &MONTHS[..1], &[50.0]),
    ]);
    let pool = CandidatePool::new(&[30], &[77]);
    let result =
        find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month).unwrap();
    assert_eq!(result, None);

    let empty = CandidatePool::new(&[77], &[77]);
    assert!(empty.is_empty());
    let result =
        find_control_store(&records, 77, &empty, Metric::TotalSales, SeriesAlignment::Month).unwrap();
    assert_eq!(result, None);
}

/// A trial store with no transactions has a zero-length series and no control.
#[test]
fn trial_store_without_transactions_is_unmatched() {
    let records = store_sales(35, &MONTHS, &[1.0, 2.0, 3.0]);
    let pool = CandidatePool::new(&[35], &[77]);
    let result =
        find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month).unwrap();
    assert_eq!(result, None);
}

/// A flat candidate has undefined correlation and is skipped.
#[test]
fn zero_variance_candidate_is_skipped() {
    let records = dataset(vec![
        store_sales(77, &MONTHS, &[100.0, 110.0, 105.0]),
        store_sales(60, &MONTHS, &[50.0, 50.0, 50.0]),
        store_sales(61, &MONTHS, &[10.0, 5.0, 7.0]),
    ]);
    let index = StoreIndex::new(&records);
    let pool = CandidatePool::new(&index.stores(), &[77]);
    let selector = ControlSelector::new(&index, SeriesAlignment::Month);
    let scores = selector.score_candidates(77, &pool, Metric::TotalSales).unwrap();
    assert_eq!(scores[0].outcome, CandidateOutcome::Undefined);

    // The only eligible candidate wins even with a negative correlation.
    let control = selector.select(77, &pool, Metric::TotalSales).unwrap().unwrap();
    assert_eq!(control.store_id, 61);
    assert!(control.correlation < 0.0);
}

/// Equal-length series over different months: positional alignment pairs
/// them anyway, month alignment only pairs the shared months.
#[test]
fn offset_calendars_depend_on_alignment() {
    let records = dataset(vec![
        store_sales(77, &["201807", "201808", "201809"], &[100.0, 110.0, 105.0]),
        store_sales(70, &["201808", "201809", "201810"], &[110.0, 105.0, 300.0]),
    ]);
    let pool = CandidatePool::new(&[70], &[77]);

    let positional =
        find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Positional)
            .unwrap()
            .unwrap();
    let by_month =
        find_control_store(&records, 77, &pool, Metric::TotalSales, SeriesAlignment::Month)
            .unwrap()
            .unwrap();

    // Shared months 201808/201809 match exactly.
    assert!((by_month.correlation - 1.0).abs() < 1e-9);
    assert!(positional.correlation < by_month.correlation);
}
