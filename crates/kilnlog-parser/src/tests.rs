use std::fs;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::{ScheduleLayout, SensorLayout};
use crate::schema::{ANNOTATION, TARGET, TARGET_SCHEDULE, TIMESTAMP};
use crate::{parse_schedule, parse_sensor_table, sensor_channels, TimestampParser};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn micros(ts: &str) -> i64 {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .expect("parse timestamp")
        .and_utc()
        .timestamp_micros()
}

fn timestamps(df: &DataFrame) -> Vec<i64> {
    df.column(TIMESTAMP)
        .expect("timestamp column")
        .cast(&DataType::Int64)
        .expect("cast")
        .i64()
        .expect("i64")
        .into_no_null_iter()
        .collect()
}

fn kiln_layout() -> SensorLayout {
    SensorLayout {
        annotation_column: Some("Comments".to_string()),
        ..SensorLayout::default()
    }
}

#[test]
fn parses_sensor_log_with_annotations() {
    let content = fixture("sensor_log.csv");
    let df = parse_sensor_table(&content, &kiln_layout(), &TimestampParser::utc())
        .expect("sensor parse failed");

    let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec![TIMESTAMP, "Front", "Middle", "Back", ANNOTATION]);
    assert_eq!(df.height(), 3, "blank trailing row should be skipped");
    assert_eq!(sensor_channels(&df), vec!["Front", "Middle", "Back"]);

    assert_eq!(
        timestamps(&df),
        vec![
            micros("2024-06-14 08:00:00"),
            micros("2024-06-14 08:10:00"),
            micros("2024-06-14 08:25:30"),
        ]
    );

    let front = df.column("Front").unwrap().f64().unwrap();
    assert_eq!(front.get(0), Some(70.0));
    assert_eq!(front.get(2), None, "NaN cells are absent readings");

    let back = df.column("Back").unwrap().f64().unwrap();
    assert_eq!(back.get(0), None);
    assert_eq!(back.get(2), Some(77.25));

    let notes = df.column(ANNOTATION).unwrap().str().unwrap();
    assert_eq!(notes.get(0), Some("lit candle"));
    assert_eq!(notes.get(1), None);
    assert_eq!(notes.get(2), Some("side stoke"));
}

#[test]
fn configured_channels_restrict_and_order_columns() {
    let content = fixture("sensor_log.csv");
    let layout = SensorLayout {
        channels: vec!["Back".to_string(), "Front".to_string()],
        ..SensorLayout::default()
    };
    let df = parse_sensor_table(&content, &layout, &TimestampParser::utc()).expect("parse");

    assert_eq!(sensor_channels(&df), vec!["Back", "Front"]);
    assert!(df.column(ANNOTATION).is_err());
    assert!(df.column("Comments").is_err());
}

#[test]
fn without_annotation_column_every_other_header_is_a_channel() {
    let content = "Timestamp,Front,Middle\n2024-06-14 08:00:00,70,71\n";
    let df = parse_sensor_table(content, &SensorLayout::default(), &TimestampParser::utc())
        .expect("parse");
    assert_eq!(sensor_channels(&df), vec!["Front", "Middle"]);
}

#[test]
fn unparseable_timestamp_fails_the_table() {
    let content = fixture("sensor_bad_timestamp.csv");
    let err = parse_sensor_table(&content, &SensorLayout::default(), &TimestampParser::utc())
        .expect_err("bad timestamp must not be dropped");

    match err {
        ParserError::DataRow {
            line_index,
            message,
            ..
        } => {
            assert_eq!(line_index, 3);
            assert!(message.contains("sometime after lunch"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unparseable_reading_fails_the_table() {
    let content = "Timestamp,Front\n2024-06-14 08:00:00,hot\n";
    let err = parse_sensor_table(content, &SensorLayout::default(), &TimestampParser::utc())
        .expect_err("non-numeric reading");
    assert!(matches!(err, ParserError::DataRow { line_index: 2, .. }));
}

#[test]
fn non_finite_readings_fail_the_table() {
    for value in ["inf", "-inf", "infinity"] {
        let content = format!("Timestamp,Front\n2024-06-14 08:00:00,70\n2024-06-14 08:01:00,{value}\n");
        let err = parse_sensor_table(&content, &SensorLayout::default(), &TimestampParser::utc())
            .expect_err("non-finite reading");
        assert!(matches!(err, ParserError::DataRow { line_index: 3, .. }), "{value}");
    }

    let schedule = "Time,Target Temperature\n2024-06-14 08:00:00,inf\n";
    let err = parse_schedule(schedule, &ScheduleLayout::default(), &TimestampParser::utc())
        .expect_err("non-finite target");
    assert!(matches!(err, ParserError::DataRow { line_index: 2, .. }));
}

#[test]
fn missing_timestamp_column_is_reported() {
    let content = "When,Front\n2024-06-14 08:00:00,70\n";
    let err = parse_sensor_table(content, &SensorLayout::default(), &TimestampParser::utc())
        .expect_err("missing column");
    match err {
        ParserError::MissingColumn { column, .. } => assert_eq!(column, "Timestamp"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn reserved_channel_names_are_rejected() {
    let content = "Timestamp,Front,Target\n2024-06-14 08:00:00,70,80\n";
    let err = parse_sensor_table(content, &SensorLayout::default(), &TimestampParser::utc())
        .expect_err("reserved name");
    assert!(matches!(err, ParserError::Validation { .. }));
}

#[test]
fn parses_target_schedule_and_ignores_extra_columns() {
    let content = fixture("target_schedule.csv");
    let df = parse_schedule(&content, &ScheduleLayout::default(), &TimestampParser::utc())
        .expect("schedule parse failed");

    let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec![TIMESTAMP, TARGET]);
    assert_eq!(
        timestamps(&df),
        vec![
            micros("2024-06-14 08:00:00"),
            micros("2024-06-14 08:20:00"),
            micros("2024-06-14 09:20:00"),
        ]
    );
    let targets: Vec<f64> = df
        .column(TARGET)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(targets, vec![70.0, 100.0, 400.0]);
}

#[test]
fn schedule_rows_require_a_target() {
    let content = fixture("schedule_missing_target.csv");
    let err = parse_schedule(&content, &ScheduleLayout::default(), &TimestampParser::utc())
        .expect_err("empty target");
    assert!(matches!(err, ParserError::DataRow { line_index: 3, .. }));
}

#[test]
fn timestamp_formats_normalize_to_the_same_instant() {
    let parser = TimestampParser::utc();
    let expected = micros("2024-06-14 08:05:00");
    for value in [
        "2024-06-14 08:05:00",
        "2024-06-14 08:05",
        "2024-06-14T08:05:00.000",
        "6/14/2024 8:05:00",
        "06/14/2024 08:05",
        "2024-06-14T10:05:00+02:00",
        "2024-06-14 04:05:00-04:00",
    ] {
        assert_eq!(parser.parse_micros(value), Ok(expected), "{value}");
    }
    assert!(parser.parse_micros("14 June").is_err());
    assert!(parser.parse_micros("  ").is_err());
}

#[test]
fn naive_timestamps_follow_the_configured_zone() {
    let parser = TimestampParser::new(chrono_tz::America::New_York);
    assert_eq!(parser.zone(), chrono_tz::America::New_York);

    assert_eq!(
        parser.parse_micros("2024-06-14 08:00:00"),
        Ok(micros("2024-06-14 12:00:00"))
    );
    // Explicit offsets win over the zone.
    assert_eq!(
        parser.parse_micros("2024-06-14T08:00:00Z"),
        Ok(micros("2024-06-14 08:00:00"))
    );
    // Fall-back overlap resolves to the earlier instant (EDT).
    assert_eq!(
        parser.parse_micros("2024-11-03 01:30:00"),
        Ok(micros("2024-11-03 05:30:00"))
    );
    assert!(parser.parse_micros("2024-03-10 02:30:00").is_err());
}

#[test]
fn empty_input_is_reported() {
    match parse_schedule("", &ScheduleLayout::default(), &TimestampParser::utc()) {
        Err(ParserError::EmptyData { table }) => assert_eq!(table, TARGET_SCHEDULE),
        other => panic!("expected EmptyData error, got {other:?}"),
    }
}
