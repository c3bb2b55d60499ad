use crate::{month::Month, types::StoreId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid month '{value}': expected YYYYMM")]
    InvalidMonth { value: String },

    #[error("Unknown metric '{name}'")]
    UnknownMetric { name: String },

    #[error("Unknown series alignment '{name}'")]
    UnknownAlignment { name: String },

    #[error("Month {month} has no transactions to aggregate")]
    EmptyMonthGroup { month: Month },

    #[error("No trial stores configured")]
    NoTrialStores,

    #[error("Trial store {store} is listed more than once")]
    DuplicateTrialStore { store: StoreId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
