use thiserror::Error;

/// Failures of the persisted key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid json in store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("corrupt value for key {key}: {value}")]
    Corrupt { key: String, value: String },
}

/// Failures loading passages for a tier
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("no passage file for {0}")]
    Missing(String),
    #[error("unable to parse passages for {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("passage file for {0} has no usable passages")]
    Empty(String),
    #[error("io error reading passages: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can go wrong during a race. None of these end the session.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Error loading text content. Using a fallback passage. ({0})")]
    ContentLoad(#[from] CorpusError),
    #[error("Copy-pasting is not allowed. Please type the text manually.")]
    PasteRejected,
    #[error("Error calculating {0}. Results might be affected.")]
    MetricComputation(&'static str),
    #[error("Unable to save progress: {0}")]
    Persistence(#[from] StoreError),
}
