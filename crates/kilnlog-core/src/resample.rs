use chrono::{Duration, NaiveDateTime};
use kilnlog_parser::schema::TARGET;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::time::{f64_values, naive_from_micros, timestamp_column, timestamp_micros};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRow {
    pub timestamp: NaiveDateTime,
    pub target: Option<f64>,
}

/// Re-expresses the target schedule on a regular grid.
///
/// The grid holds every whole multiple of `interval` between the first and last schedule
/// timestamps, inclusive. Each grid value is the linear interpolation of the two bracketing
/// schedule points; a grid instant that coincides with a schedule point takes its value
/// unchanged. Nothing is extrapolated, so a grid instant without a point on both sides (or on
/// it) stays null.
///
/// Schedule timestamps must be strictly increasing.
pub fn resample_schedule(schedule: &DataFrame, interval: Duration) -> Result<DataFrame> {
    let step = interval
        .num_microseconds()
        .filter(|step| *step > 0)
        .ok_or_else(|| PipelineError::Config(format!("invalid resample interval {interval}")))?;

    let times = timestamp_micros(schedule)?;
    let values = f64_values(schedule, TARGET)?;

    if times.is_empty() {
        return Err(PipelineError::EmptySchedule);
    }
    check_strictly_increasing(&times)?;

    let points: Vec<(i64, f64)> = times
        .iter()
        .zip(values)
        .filter_map(|(t, v)| v.map(|v| (*t, v)))
        .collect();

    let first = times[0];
    let last = times[times.len() - 1];
    let (grid, targets) = interpolate_onto_grid(&points, first, last, step);

    debug!(
        schedule_points = points.len(),
        grid_points = grid.len(),
        interval_minutes = interval.num_minutes(),
        "resampled target schedule"
    );

    Ok(DataFrame::new(vec![
        timestamp_column(grid)?,
        Series::new(TARGET.into(), targets).into(),
    ])?)
}

pub fn target_rows(resampled: &DataFrame) -> Result<Vec<TargetRow>> {
    let times = timestamp_micros(resampled)?;
    let targets = f64_values(resampled, TARGET)?;
    times
        .into_iter()
        .zip(targets)
        .map(|(ts, target)| {
            Ok(TargetRow {
                timestamp: naive_from_micros(ts)?,
                target,
            })
        })
        .collect()
}

fn check_strictly_increasing(times: &[i64]) -> Result<()> {
    for (idx, window) in times.windows(2).enumerate() {
        if window[1] <= window[0] {
            return Err(PipelineError::UnorderedInput {
                index: idx + 1,
                previous: naive_from_micros(window[0])?,
                current: naive_from_micros(window[1])?,
            });
        }
    }
    Ok(())
}

/// First multiple of `step` at or after `start`, and last at or before `end`.
fn grid_bounds(start: i64, end: i64, step: i64) -> (i64, i64) {
    let mut first = start.div_euclid(step) * step;
    if first < start {
        first += step;
    }
    (first, end.div_euclid(step) * step)
}

fn interpolate_onto_grid(
    points: &[(i64, f64)],
    start: i64,
    end: i64,
    step: i64,
) -> (Vec<i64>, Vec<Option<f64>>) {
    let (first, last) = grid_bounds(start, end, step);
    if last < first {
        return (Vec::new(), Vec::new());
    }

    let len = ((last - first) / step) as usize + 1;
    let mut grid = Vec::with_capacity(len);
    let mut targets = Vec::with_capacity(len);
    let mut idx = 0;

    for n in 0..len {
        let t = first + n as i64 * step;
        while idx + 1 < points.len() && points[idx + 1].0 <= t {
            idx += 1;
        }

        let value = match points.get(idx) {
            Some(&(t0, v0)) if t0 == t => Some(v0),
            Some(&(t0, v0)) if t0 < t => points.get(idx + 1).map(|&(t1, v1)| {
                let frac = (t - t0) as f64 / (t1 - t0) as f64;
                v0 + (v1 - v0) * frac
            }),
            _ => None,
        };

        grid.push(t);
        targets.push(value);
    }

    (grid, targets)
}
