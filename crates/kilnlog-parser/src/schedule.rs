use polars::prelude::*;

use crate::common::{
    build_frame, build_timestamp_column, find_column, is_blank, line_of, parse_required_f64,
    read_headers,
};
use crate::errors::ParserError;
use crate::model::ScheduleLayout;
use crate::schema::{TARGET, TARGET_SCHEDULE};
use crate::timestamp::TimestampParser;

/// Parses the planned firing curve into `timestamp` and `target` columns, in file order.
///
/// Columns other than the two named by `layout` are ignored. Every non-blank row must carry a
/// target value. Ordering is not checked here.
pub fn parse_schedule(
    content: &str,
    layout: &ScheduleLayout,
    timestamps: &TimestampParser,
) -> Result<DataFrame, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = read_headers(TARGET_SCHEDULE, &mut reader)?;

    let timestamp_idx = find_column(TARGET_SCHEDULE, &headers, &layout.timestamp_column)?;
    let target_idx = find_column(TARGET_SCHEDULE, &headers, &layout.target_column)?;

    let mut timestamp_values = Vec::new();
    let mut targets = Vec::new();

    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv {
            table: TARGET_SCHEDULE,
            source,
        })?;
        if is_blank(&record) {
            continue;
        }
        let line_index = line_of(&record, row_index);

        let raw_ts = record.get(timestamp_idx).unwrap_or_default();
        timestamp_values.push(timestamps.parse_field(TARGET_SCHEDULE, raw_ts, line_index)?);

        let raw_target = record.get(target_idx).unwrap_or_default();
        targets.push(parse_required_f64(
            TARGET_SCHEDULE,
            raw_target,
            line_index,
            &layout.target_column,
        )?);
    }

    build_frame(
        TARGET_SCHEDULE,
        vec![
            build_timestamp_column(TARGET_SCHEDULE, timestamp_values)?,
            Series::new(TARGET.into(), targets).into(),
        ],
    )
}
