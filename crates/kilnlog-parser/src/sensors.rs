use polars::prelude::*;

use crate::common::{
    build_frame, build_timestamp_column, check_channel_name, find_column, is_blank, line_of,
    parse_optional_f64, read_headers,
};
use crate::errors::ParserError;
use crate::model::SensorLayout;
use crate::schema::{ANNOTATION, SENSOR_TABLE, TIMESTAMP};
use crate::timestamp::TimestampParser;

struct ChannelColumn {
    name: String,
    index: usize,
    values: Vec<Option<f64>>,
}

/// Parses the operator's reading log into a frame of `timestamp`, one `Float64` column per
/// channel (named as in the source header) and, when configured, an `annotation` column.
///
/// Blank rows are skipped; any other row with an unparseable timestamp or reading fails the
/// whole table.
pub fn parse_sensor_table(
    content: &str,
    layout: &SensorLayout,
    timestamps: &TimestampParser,
) -> Result<DataFrame, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = read_headers(SENSOR_TABLE, &mut reader)?;

    let timestamp_idx = find_column(SENSOR_TABLE, &headers, &layout.timestamp_column)?;
    let annotation_idx = layout
        .annotation_column
        .as_deref()
        .map(|name| find_column(SENSOR_TABLE, &headers, name))
        .transpose()?;

    let channel_names: Vec<String> = if layout.channels.is_empty() {
        headers
            .iter()
            .enumerate()
            .filter(|(idx, header)| {
                *idx != timestamp_idx && Some(*idx) != annotation_idx && !header.is_empty()
            })
            .map(|(_, header)| header.clone())
            .collect()
    } else {
        layout.channels.clone()
    };

    if channel_names.is_empty() {
        return Err(ParserError::Validation {
            table: SENSOR_TABLE,
            message: "no sensor channels found".to_string(),
        });
    }

    let mut channels = Vec::with_capacity(channel_names.len());
    for name in channel_names {
        check_channel_name(SENSOR_TABLE, &name)?;
        if channels.iter().any(|c: &ChannelColumn| c.name == name) {
            return Err(ParserError::Validation {
                table: SENSOR_TABLE,
                message: format!("channel '{name}' listed twice"),
            });
        }
        let index = find_column(SENSOR_TABLE, &headers, &name)?;
        if index == timestamp_idx || Some(index) == annotation_idx {
            return Err(ParserError::Validation {
                table: SENSOR_TABLE,
                message: format!("column '{name}' cannot be both a channel and a key column"),
            });
        }
        channels.push(ChannelColumn {
            name,
            index,
            values: Vec::new(),
        });
    }

    let mut timestamp_values = Vec::new();
    let mut annotations: Vec<Option<String>> = Vec::new();

    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv {
            table: SENSOR_TABLE,
            source,
        })?;
        if is_blank(&record) {
            continue;
        }
        let line_index = line_of(&record, row_index);

        let raw_ts = record.get(timestamp_idx).unwrap_or_default();
        timestamp_values.push(timestamps.parse_field(SENSOR_TABLE, raw_ts, line_index)?);

        for channel in channels.iter_mut() {
            let raw = record.get(channel.index).unwrap_or_default();
            let value = parse_optional_f64(SENSOR_TABLE, raw, line_index, &channel.name)?;
            channel.values.push(value);
        }

        if let Some(idx) = annotation_idx {
            let note = record
                .get(idx)
                .map(str::trim)
                .filter(|note| !note.is_empty())
                .map(str::to_string);
            annotations.push(note);
        }
    }

    let mut columns = Vec::with_capacity(channels.len() + 2);
    columns.push(build_timestamp_column(SENSOR_TABLE, timestamp_values)?);
    for channel in channels {
        columns.push(Series::new(channel.name.as_str().into(), channel.values).into());
    }
    if annotation_idx.is_some() {
        let utf8: Vec<Option<&str>> = annotations.iter().map(|v| v.as_deref()).collect();
        columns.push(Series::new(ANNOTATION.into(), utf8).into());
    }

    build_frame(SENSOR_TABLE, columns)
}

/// Channel columns of a parsed sensor frame, in column order.
pub fn sensor_channels(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .filter(|name| *name != TIMESTAMP && *name != ANNOTATION)
        .map(str::to_string)
        .collect()
}
