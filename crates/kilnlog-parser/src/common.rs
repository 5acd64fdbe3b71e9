use polars::prelude::*;

use crate::errors::ParserError;
use crate::schema::{RESERVED_COLUMNS, TIMESTAMP};

pub(crate) fn read_headers(
    table: &'static str,
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, ParserError> {
    let headers = reader
        .headers()
        .map_err(|source| ParserError::Csv { table, source })?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParserError::EmptyData { table });
    }
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

pub(crate) fn find_column(
    table: &'static str,
    headers: &[String],
    name: &str,
) -> Result<usize, ParserError> {
    headers
        .iter()
        .position(|header| header == name.trim())
        .ok_or_else(|| ParserError::MissingColumn {
            table,
            column: name.to_string(),
        })
}

pub(crate) fn check_channel_name(table: &'static str, name: &str) -> Result<(), ParserError> {
    if RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(ParserError::Validation {
            table,
            message: format!("channel name '{name}' collides with a reserved column"),
        });
    }
    Ok(())
}

/// Spreadsheet exports often trail rows of bare delimiters.
pub(crate) fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

pub(crate) fn line_of(record: &csv::StringRecord, row_index: usize) -> usize {
    record
        .position()
        .map(|pos| pos.line() as usize)
        .unwrap_or(row_index + 2)
}

pub(crate) fn parse_optional_f64(
    table: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    let parsed = trimmed
        .parse::<f64>()
        .map_err(|err| ParserError::DataRow {
            table,
            line_index,
            message: format!("failed to parse column '{column}' as number: {err}"),
        })?;
    if !parsed.is_finite() {
        return Err(ParserError::DataRow {
            table,
            line_index,
            message: format!("column '{column}' holds non-finite value '{trimmed}'"),
        });
    }
    Ok(Some(parsed))
}

pub(crate) fn parse_required_f64(
    table: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<f64, ParserError> {
    parse_optional_f64(table, value, line_index, column)?.ok_or_else(|| ParserError::DataRow {
        table,
        line_index,
        message: format!("column '{column}' is empty"),
    })
}

pub(crate) fn build_timestamp_column(
    table: &'static str,
    micros: Vec<i64>,
) -> Result<Column, ParserError> {
    Series::new(TIMESTAMP.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map(Column::from)
        .map_err(|err| ParserError::Validation {
            table,
            message: format!("failed to cast timestamp column: {err}"),
        })
}

pub(crate) fn build_frame(table: &'static str, columns: Vec<Column>) -> Result<DataFrame, ParserError> {
    DataFrame::new(columns).map_err(|err| ParserError::Validation {
        table,
        message: format!("failed to build dataframe: {err}"),
    })
}
