use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("column `{column}` missing from {table} table")]
    MissingColumn { table: &'static str, column: String },

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
