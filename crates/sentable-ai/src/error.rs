use sentable_core::TableError;
use thiserror::Error;

/// The classifier could not produce a prediction.
///
/// Every variant is an infrastructure failure. None of them is retried
/// automatically.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),

    #[error("failed to fetch model files: {0}")]
    Fetch(String),

    #[error("model label vocabulary not supported: {0}")]
    Vocabulary(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("column {column:?} not found (available: {})", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("model unavailable{}: {source}", row_suffix(.row))]
    ModelUnavailable {
        /// Global 0-based row index, when the failure happened mid-batch.
        row: Option<usize>,
        #[source]
        source: ModelError,
    },

    #[error("batch cancelled after {processed} of {total} rows")]
    Cancelled { processed: usize, total: usize },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}
