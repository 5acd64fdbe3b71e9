use kilnlog_parser::schema::{ANNOTATION, TIMESTAMP};
use polars::prelude::*;
use tracing::debug;

use crate::config::FillPolicy;
use crate::error::Result;
use crate::time::{f64_values, str_values, timestamp_micros};

const SENSOR_ORDER: &str = "__sensor_order";

/// Full outer join of sensor readings and the resampled target grid on exact timestamp
/// equality, sorted ascending by timestamp.
///
/// Rows present on one side only get nulls in the other side's columns. Sensor rows sharing a
/// timestamp keep their input order.
pub fn join_readings(sensors: &DataFrame, targets: &DataFrame) -> Result<DataFrame> {
    let ordered = sensors.with_row_index(SENSOR_ORDER.into(), None)?;

    let joined = ordered
        .lazy()
        .join(
            targets.clone().lazy(),
            [col(TIMESTAMP)],
            [col(TIMESTAMP)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
        .sort(
            [TIMESTAMP, SENSOR_ORDER],
            SortMultipleOptions::default().with_nulls_last(true),
        )
        .collect()?
        .drop(SENSOR_ORDER)?;

    debug!(
        sensor_rows = sensors.height(),
        target_rows = targets.height(),
        merged_rows = joined.height(),
        "joined readings with target grid"
    );

    Ok(joined)
}

/// Fills absent values of every listed numeric column according to `policy`.
///
/// Expects `merged` to be sorted by timestamp.
pub fn fill_gaps(merged: &DataFrame, fields: &[String], policy: FillPolicy) -> Result<DataFrame> {
    if policy == FillPolicy::None {
        return Ok(merged.clone());
    }

    let times = timestamp_micros(merged)?;
    let mut output = merged.clone();

    for field in fields {
        let mut values = f64_values(merged, field)?;
        let before = values.iter().filter(|v| v.is_none()).count();
        match policy {
            FillPolicy::None => {}
            FillPolicy::Forward => fill_forward(&mut values),
            FillPolicy::Backward => fill_backward(&mut values),
            FillPolicy::Interpolate => fill_interpolated(&times, &mut values),
        }
        let after = values.iter().filter(|v| v.is_none()).count();
        debug!(field = field.as_str(), filled = before - after, remaining = after, "filled gaps");

        output.with_column(Series::new(field.as_str().into(), values))?;
    }

    Ok(output)
}

/// Spreads operator annotations into neighbouring empty rows. Only the directional policies
/// apply; `None` and `Interpolate` leave annotations where they were logged.
pub fn fill_annotations(merged: &DataFrame, policy: FillPolicy) -> Result<DataFrame> {
    let mut values = str_values(merged, ANNOTATION)?;
    match policy {
        FillPolicy::Forward => fill_forward(&mut values),
        FillPolicy::Backward => fill_backward(&mut values),
        FillPolicy::None | FillPolicy::Interpolate => return Ok(merged.clone()),
    }

    let utf8: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
    let mut output = merged.clone();
    output.with_column(Series::new(ANNOTATION.into(), utf8))?;
    Ok(output)
}

pub(crate) fn fill_backward<T: Clone>(values: &mut [Option<T>]) {
    let mut next: Option<T> = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(v.clone()),
            None => *value = next.clone(),
        }
    }
}

pub(crate) fn fill_forward<T: Clone>(values: &mut [Option<T>]) {
    let mut prev: Option<T> = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => prev = Some(v.clone()),
            None => *value = prev.clone(),
        }
    }
}

pub(crate) fn fill_interpolated(times: &[i64], values: &mut [Option<f64>]) {
    let mut prev: Option<usize> = None;
    for idx in 0..values.len() {
        if values[idx].is_none() {
            continue;
        }
        if let Some(p) = prev {
            if idx > p + 1 {
                let (t0, v0) = (times[p], values[p].unwrap_or_default());
                let (t1, v1) = (times[idx], values[idx].unwrap_or_default());
                for gap in p + 1..idx {
                    let value = if t1 == t0 {
                        v0
                    } else {
                        v0 + (v1 - v0) * (times[gap] - t0) as f64 / (t1 - t0) as f64
                    };
                    values[gap] = Some(value);
                }
            }
        }
        prev = Some(idx);
    }
}
