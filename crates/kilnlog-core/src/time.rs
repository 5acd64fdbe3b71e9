use chrono::{DateTime, NaiveDateTime};
use kilnlog_parser::schema::TIMESTAMP;
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Reads the `timestamp` column as UTC microseconds. Null timestamps are an error.
pub(crate) fn timestamp_micros(df: &DataFrame) -> Result<Vec<i64>> {
    let column = df
        .column(TIMESTAMP)
        .map_err(|_| PipelineError::MissingColumn(TIMESTAMP.to_string()))?;
    let physical = column.cast(&DataType::Int64)?;
    physical
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            value.ok_or_else(|| PipelineError::Processing(format!("row {idx} has no timestamp")))
        })
        .collect()
}

pub(crate) fn timestamp_column(micros: Vec<i64>) -> Result<Column> {
    let series = Series::new(TIMESTAMP.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(series.into())
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
    Ok(column.f64()?.into_iter().collect())
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

pub(crate) fn naive_from_micros(value: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_micros(value)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| PipelineError::Processing(format!("timestamp {value} out of range")))
}
