use crate::{
    error::AnalysisError,
    metrics::Metric,
    selector::SeriesAlignment,
    types::StoreId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Trial design ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrialDesignFile {
    trial_stores: Vec<StoreId>,
    selection_metric: Metric,
    #[serde(default)]
    alignment: SeriesAlignment,
    #[serde(default = "default_significance_level")]
    significance_level: f64,
}

fn default_significance_level() -> f64 {
    0.05
}

// ── Cleaning rules ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Rows with at least this many packs are business purchases.
    pub bulk_quantity_threshold: u32,
    /// Product names containing any of these terms are not chips.
    pub excluded_product_terms: Vec<String>,
    /// First-word brand spellings mapped to the canonical brand.
    pub brand_aliases: BTreeMap<String, String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let brand_aliases = [
            ("Red", "RRD"),
            ("Smith", "Smiths"),
            ("Dorito", "Doritos"),
            ("Snbts", "Sunbites"),
            ("Infzns", "Infuzions"),
            ("WW", "Woolworths"),
            ("NCC", "Natural"),
            ("Grain", "GrnWves"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self {
            bulk_quantity_threshold: 200,
            excluded_product_terms: vec!["Salsa".into()],
            brand_aliases,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    pub trial_stores: Vec<StoreId>,
    /// Metric driving control-store selection.
    pub selection_metric: Metric,
    pub alignment: SeriesAlignment,
    /// Display threshold for the verdict report. The evaluator ignores it.
    pub significance_level: f64,
    pub cleaning: CleaningConfig,
}

impl TrialConfig {
    /// Load from the data/ directory.
    /// In tests, use TrialConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let design_path = format!("{data_dir}/trial_config.json");
        let design_content = std::fs::read_to_string(&design_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {design_path}: {e}"))?;
        let design: TrialDesignFile = serde_json::from_str(&design_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {design_path}: {e}"))?;

        let cleaning_path = format!("{data_dir}/cleaning/cleaning_rules.json");
        let cleaning = match std::fs::read_to_string(&cleaning_path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {cleaning_path}: {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{cleaning_path} not found; using default cleaning rules");
                CleaningConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("Cannot read {cleaning_path}: {e}")),
        };

        let config = Self {
            trial_stores: design.trial_stores,
            selection_metric: design.selection_metric,
            alignment: design.alignment,
            significance_level: design.significance_level,
            cleaning,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            trial_stores: vec![77, 86, 88],
            selection_metric: Metric::TotalSales,
            alignment: SeriesAlignment::Month,
            significance_level: 0.05,
            cleaning: CleaningConfig::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.trial_stores.is_empty() {
            anyhow::bail!("trial_stores must name at least one store");
        }
        let mut seen = BTreeSet::new();
        if let Some(&store) = self.trial_stores.iter().find(|s| !seen.insert(**s)) {
            return Err(AnalysisError::DuplicateTrialStore { store }.into());
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            anyhow::bail!(
                "significance_level must be in (0, 1); got {}",
                self.significance_level
            );
        }
        Ok(())
    }
}
