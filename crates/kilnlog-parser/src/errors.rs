use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{table} is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: String,
    },

    #[error("{table} CSV error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} data row {line_index} invalid: {message}")]
    DataRow {
        table: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{table} has no header row")]
    EmptyData { table: &'static str },

    #[error("{table} validation error: {message}")]
    Validation {
        table: &'static str,
        message: String,
    },
}
