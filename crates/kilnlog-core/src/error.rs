// crates/kilnlog-core/src/error.rs

use chrono::NaiveDateTime;
use kilnlog_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParserError),

    #[error("Target schedule has no rows")]
    EmptySchedule,

    #[error("Target schedule is not strictly increasing at row {index}: {current} follows {previous}")]
    UnorderedInput {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("Sensor source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Column '{0}' missing from table")]
    MissingColumn(String),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
