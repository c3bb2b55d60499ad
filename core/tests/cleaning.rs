use chrono::NaiveDate;
use qvi_core::{
    cleaning::{self, brand, missing_dates, pack_size},
    config::CleaningConfig,
    loader,
    record::to_transactions,
    segments::{compare_quantity, SegmentKey},
    stats::TestOutcome,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const TRANSACTIONS_CSV: &str = "\
DATE,STORE_NBR,LYLTY_CARD_NBR,TXN_ID,PROD_NBR,PROD_NAME,PROD_QTY,TOT_SALES
43390,1,1000,1,5,Natural Chip        Compny SeaSalt175g,2,6.0
43390,1,1000,1,5,Natural Chip        Compny SeaSalt175g,2,6.0
43599,1,1307,348,66,CCs Nacho Cheese    175g,3,6.3
43605,1,1343,383,61,Smiths Crinkle Cut  Chips Chicken 170g,2,2.9
43329,2,2373,974,69,Smiths Chip Thinly  S/Cream&Onion 175g,5,15.0
43330,2,2426,1038,108,Kettle Tortilla ChpsHny&Jlpno Chili 150g,3,13.8
43604,4,4074,2982,57,Old El Paso Salsa   Dip Tomato Mild 300g,1,5.1
43601,4,4149,3333,16,Smiths Crinkle Chips Salt & Vinegar 330g,200,650.0
43601,4,4196,3539,24,Grain Waves         Sweet Chilli 210g,1,3.6
,5,5026,4525,42,Doritos Corn Chip Mexican Jalapeno 150g,1,3.9
43601,five,5026,4525,42,Doritos Corn Chip Mexican Jalapeno 150g,1,3.9
43601,5,9999,4526,42,Dorito Corn Chp     Supreme 380g,1,3.25
";

const SEGMENTS_CSV: &str = "\
LYLTY_CARD_NBR,LIFESTAGE,PREMIUM_CUSTOMER
1000,YOUNG SINGLES/COUPLES,Premium
1307,MIDAGE SINGLES/COUPLES,Budget
1343,MIDAGE SINGLES/COUPLES,Budget
2373,MIDAGE SINGLES/COUPLES,Budget
2426,MIDAGE SINGLES/COUPLES,Budget
4074,MIDAGE SINGLES/COUPLES,Budget
4149,MIDAGE SINGLES/COUPLES,Budget
4196,MIDAGE SINGLES/COUPLES,Budget
4196,RETIREES,Mainstream
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Missing and non-numeric fields are dropped and counted, not fatal.
#[test]
fn malformed_rows_are_dropped_and_counted() {
    init_logging();
    let (raw, report) = loader::read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap();
    assert_eq!(report.rows_read, 12);
    assert_eq!(report.rows_dropped, 2);
    assert_eq!(report.rows_kept(), raw.len());
    assert_eq!(raw[0].date, NaiveDate::from_ymd_opt(2018, 10, 17).unwrap());
}

/// Every cleaning stage removes what it should and reports it.
#[test]
fn cleaning_pipeline_counts_each_stage() {
    init_logging();
    let (raw, _) = loader::read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap();
    let (segments, seg_report) = loader::read_segments(SEGMENTS_CSV.as_bytes()).unwrap();
    assert_eq!(seg_report.rows_dropped, 0);

    let (purchases, report) = cleaning::clean(raw, &segments, &CleaningConfig::default());

    assert_eq!(report.raw_rows, 10);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.bulk_outliers_removed, 1);
    assert_eq!(report.excluded_products_removed, 1);
    assert_eq!(report.unmatched_customers_removed, 1);
    assert_eq!(report.duplicate_segment_keys, 1);
    assert_eq!(report.purchases, 6);
    assert_eq!(purchases.len(), 6);

    assert!(purchases.iter().all(|p| !p.product_name.contains("Salsa")));
    assert!(purchases.iter().all(|p| p.product_qty < 200));

    // The first segment entry for a repeated card wins.
    let grain = purchases.iter().find(|p| p.customer_id == 4196).unwrap();
    assert_eq!(grain.lifestage, "MIDAGE SINGLES/COUPLES");
    assert_eq!(grain.brand, "GrnWves");
    assert_eq!(grain.pack_size_g, Some(210));

    let transactions = to_transactions(&purchases);
    assert_eq!(transactions[0].month.to_string(), "201810");
}

#[test]
fn brand_aliases_apply_to_first_word_only() {
    let aliases = CleaningConfig::default().brand_aliases;
    assert_eq!(brand("Red Rock Deli Chikn&Garlic Aioli 150g", &aliases), "RRD");
    assert_eq!(brand("Smith Crinkle Cut    Bolognese 150g", &aliases), "Smiths");
    assert_eq!(brand("Smiths Crinkle Cut  Chips Original 330g", &aliases), "Smiths");
    assert_eq!(brand("WW Original Stacked Chips 160g", &aliases), "Woolworths");
    assert_eq!(brand("Kettle Tortilla ChpsHny&Jlpno Chili 150g", &aliases), "Kettle");
}

#[test]
fn pack_size_is_first_digit_run() {
    assert_eq!(pack_size("Natural Chip        Compny SeaSalt175g"), Some(175));
    assert_eq!(pack_size("Kettle 135g Swt Pot Sea Salt"), Some(135));
    assert_eq!(pack_size("Plain Chips"), None);
}

/// Christmas Day has no trading and shows up as a missing date.
#[test]
fn missing_trading_dates_are_listed() {
    let d = |day| NaiveDate::from_ymd_opt(2018, 12, day).unwrap();
    let missing = missing_dates([d(23), d(24), d(26), d(24), d(27)]);
    assert_eq!(missing, vec![d(25)]);
    assert!(missing_dates(Vec::new()).is_empty());
}

/// Welch test between two segments on packs per purchase.
#[test]
fn segment_quantity_comparison() {
    let (raw, _) = loader::read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap();
    let (segments, _) = loader::read_segments(SEGMENTS_CSV.as_bytes()).unwrap();
    let (purchases, _) = cleaning::clean(raw, &segments, &CleaningConfig::default());

    let midage = SegmentKey::new("MIDAGE SINGLES/COUPLES", "Budget");
    let young = SegmentKey::new("YOUNG SINGLES/COUPLES", "Premium");
    let cmp = compare_quantity(&purchases, &midage, &young);
    assert_eq!(cmp.a_count, 5);
    assert_eq!(cmp.b_count, 1);
    assert_eq!(cmp.outcome, TestOutcome::InsufficientData { observations: 1 });
    assert_eq!(cmp.b_mean_quantity, Some(2.0));
}
