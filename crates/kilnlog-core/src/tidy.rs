use chrono::NaiveDateTime;
use kilnlog_parser::schema::{ANNOTATION, TARGET};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::time::{f64_values, naive_from_micros, str_values, timestamp_column, timestamp_micros};

pub const MEASUREMENT: &str = "measurement";
pub const VALUE: &str = "value";

/// One plotted point: a (timestamp, measurement) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub timestamp: NaiveDateTime,
    pub measurement: String,
    pub value: Option<f64>,
    pub annotation: Option<String>,
}

/// Which merged columns become measurements, and how.
#[derive(Debug, Clone)]
pub struct TidyLayout<'a> {
    pub channels: &'a [String],
    pub target_label: &'a str,
    pub annotation_channel: Option<&'a str>,
    pub drop_missing: bool,
}

/// Reshapes the wide merged table into `timestamp`, `measurement`, `value`, `annotation`.
///
/// Rows come out measurement-major: every row of the first channel in timestamp order, then
/// the next channel, with the target series last. The annotation column is only populated on
/// rows of `annotation_channel`.
pub fn to_tidy(merged: &DataFrame, layout: &TidyLayout<'_>) -> Result<DataFrame> {
    let times = timestamp_micros(merged)?;
    let notes = match (layout.annotation_channel, merged.column(ANNOTATION).is_ok()) {
        (Some(_), true) => Some(str_values(merged, ANNOTATION)?),
        _ => None,
    };

    let series: Vec<(&str, &str)> = layout
        .channels
        .iter()
        .map(|channel| (channel.as_str(), channel.as_str()))
        .chain(std::iter::once((TARGET, layout.target_label)))
        .collect();

    let capacity = times.len() * series.len();
    let mut out_times = Vec::with_capacity(capacity);
    let mut measurements: Vec<&str> = Vec::with_capacity(capacity);
    let mut values = Vec::with_capacity(capacity);
    let mut annotations: Vec<Option<&str>> = Vec::with_capacity(capacity);

    for (column, label) in series {
        let column_values = f64_values(merged, column)?;
        let carries_notes = layout.annotation_channel == Some(column) && column != TARGET;

        for (row, value) in column_values.into_iter().enumerate() {
            if value.is_none() && layout.drop_missing {
                continue;
            }
            out_times.push(times[row]);
            measurements.push(label);
            values.push(value);
            annotations.push(match (&notes, carries_notes) {
                (Some(notes), true) => notes[row].as_deref(),
                _ => None,
            });
        }
    }

    debug!(
        merged_rows = merged.height(),
        tidy_rows = out_times.len(),
        "reshaped merged table to tidy form"
    );

    Ok(DataFrame::new(vec![
        timestamp_column(out_times)?,
        Series::new(MEASUREMENT.into(), measurements).into(),
        Series::new(VALUE.into(), values).into(),
        Series::new(ANNOTATION.into(), annotations).into(),
    ])?)
}

/// Materializes a tidy frame as typed rows, in frame order.
pub fn tidy_rows(tidy: &DataFrame) -> Result<Vec<TidyRow>> {
    let times = timestamp_micros(tidy)?;
    let measurements = str_values(tidy, MEASUREMENT)?;
    let values = f64_values(tidy, VALUE)?;
    let annotations = str_values(tidy, ANNOTATION)?;

    times
        .into_iter()
        .zip(measurements)
        .zip(values)
        .zip(annotations)
        .enumerate()
        .map(|(idx, (((ts, measurement), value), annotation))| {
            Ok(TidyRow {
                timestamp: naive_from_micros(ts)?,
                measurement: measurement.ok_or_else(|| {
                    PipelineError::Processing(format!("tidy row {idx} has no measurement"))
                })?,
                value,
                annotation,
            })
        })
        .collect()
}
