use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("result table error: {0}")]
    Csv(#[from] csv::Error),
}
