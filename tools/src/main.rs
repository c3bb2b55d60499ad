//! trial-runner: headless trial analysis runner for the chips category.
//!
//! Usage:
//!   trial-runner --transactions QVI_transaction_data.csv --segments QVI_purchase_behaviour.csv
//!   trial-runner --synthetic --seed 12345 --db trial.db --out-dir out
//!   trial-runner --synthetic --segment-test
//!
//! --segment-test also prints a Welch test of packs per purchase between
//! Mainstream young and midage singles/couples.
//!
//! Overrides for data/trial_config.json:
//!   --trial-stores 77,86,88  --metric total_sales  --alignment month  --alpha 0.05

use anyhow::{Context, Result};
use qvi_core::{
    cleaning::{self, CleaningReport},
    config::TrialConfig,
    engine::TrialEngine,
    loader,
    record::{to_transactions, PurchaseRecord},
    report,
    segments::{self, SegmentKey},
    stats::TestOutcome,
    store::AnalysisStore,
    synth::{self, SyntheticConfig},
    types::{new_run_id, StoreId},
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let synthetic = args.iter().any(|a| a == "--synthetic");
    let segment_test = args.iter().any(|a| a == "--segment-test");
    let seed = parse_arg(&args, "--seed", 42u64);
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let out_dir = string_arg(&args, "--out-dir");

    let mut config = TrialConfig::load(data_dir)?;
    apply_overrides(&mut config, &args)?;

    println!("Chips trial analysis — trial-runner");
    println!("  data_dir:      {data_dir}");
    println!("  db:            {db}");
    println!("  trial stores:  {:?}", config.trial_stores);
    println!("  metric:        {}", config.selection_metric);
    println!("  alignment:     {}", config.alignment);
    println!();

    let purchases = if synthetic {
        let mut synth_config = SyntheticConfig::default_with_seed(seed);
        for store in &config.trial_stores {
            if !synth_config.stores.contains(store) {
                synth_config.stores.push(*store);
            }
        }
        synth_config.trial_stores = config.trial_stores.clone();
        println!("  synthetic seed: {seed}");
        synth::generate(&synth_config)
    } else {
        load_and_clean(&args, &config)?
    };

    if segment_test {
        print_segment_test(&purchases);
    }

    let store = AnalysisStore::open(db)?;
    store.migrate()?;

    let run_id = new_run_id();
    let alpha = config.significance_level;
    let mut engine = TrialEngine::build(run_id.clone(), config, store)?;
    let records = to_transactions(&purchases);
    let trial_report = engine.run(&records)?;

    println!("=== TRIAL VERDICTS (run {run_id}) ===");
    print!("{}", report::format_verdicts(&trial_report, alpha));

    if let Some(dir) = out_dir {
        report::export_csv(dir, &trial_report)?;
        println!();
        println!("Exported comparison.csv and differences.csv to {dir}");
    }
    Ok(())
}

fn load_and_clean(args: &[String], config: &TrialConfig) -> Result<Vec<PurchaseRecord>> {
    let tx_path = string_arg(args, "--transactions")
        .context("--transactions <csv> is required unless --synthetic is given")?;
    let seg_path = string_arg(args, "--segments")
        .context("--segments <csv> is required unless --synthetic is given")?;

    let (raw, tx_load) = loader::load_transactions(tx_path)
        .with_context(|| format!("loading {tx_path}"))?;
    let (segs, seg_load) = loader::load_segments(seg_path)
        .with_context(|| format!("loading {seg_path}"))?;
    let (purchases, cleaning_report) = cleaning::clean(raw, &segs, &config.cleaning);

    println!("=== DATA LOAD ===");
    println!("  transactions:  {} read, {} malformed", tx_load.rows_read, tx_load.rows_dropped);
    println!("  segments:      {} read, {} malformed", seg_load.rows_read, seg_load.rows_dropped);
    print_cleaning_summary(&cleaning_report);
    Ok(purchases)
}

fn print_cleaning_summary(r: &CleaningReport) {
    println!("=== CLEANING ===");
    println!("  raw rows:            {}", r.raw_rows);
    println!("  duplicates removed:  {}", r.duplicates_removed);
    println!("  bulk outliers:       {}", r.bulk_outliers_removed);
    println!("  excluded products:   {}", r.excluded_products_removed);
    println!("  unmatched customers: {}", r.unmatched_customers_removed);
    println!("  purchases kept:      {}", r.purchases);
    if r.missing_dates.is_empty() {
        println!("  trading calendar:    complete");
    } else {
        let dates: Vec<String> = r.missing_dates.iter().map(|d| d.to_string()).collect();
        println!("  missing dates:       {}", dates.join(", "));
    }
    println!();
}

fn print_segment_test(purchases: &[PurchaseRecord]) {
    let young = SegmentKey::new("YOUNG SINGLES/COUPLES", "Mainstream");
    let midage = SegmentKey::new("MIDAGE SINGLES/COUPLES", "Mainstream");
    let cmp = segments::compare_quantity(purchases, &young, &midage);

    println!("=== SEGMENT QUANTITY TEST (Welch) ===");
    println!("  {} / {}: n = {}", young.lifestage, young.premium_customer, cmp.a_count);
    println!("  {} / {}: n = {}", midage.lifestage, midage.premium_customer, cmp.b_count);
    match cmp.outcome {
        TestOutcome::Computed { statistic, p_value, degrees_of_freedom, .. } => println!(
            "  t = {statistic:.3}, df = {degrees_of_freedom:.1}, p-value = {p_value:.10}"
        ),
        other => println!("  not testable: {}", other.kind()),
    }
    println!();
}

fn apply_overrides(config: &mut TrialConfig, args: &[String]) -> Result<()> {
    if let Some(list) = string_arg(args, "--trial-stores") {
        config.trial_stores = list
            .split(',')
            .map(|s| s.trim().parse::<StoreId>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("invalid --trial-stores '{list}'"))?;
    }
    if let Some(metric) = string_arg(args, "--metric") {
        config.selection_metric = metric.parse()?;
    }
    if let Some(alignment) = string_arg(args, "--alignment") {
        config.alignment = alignment.parse()?;
    }
    config.significance_level = parse_arg(args, "--alpha", config.significance_level);
    config.validate()
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
