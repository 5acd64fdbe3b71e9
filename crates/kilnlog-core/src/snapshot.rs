use chrono::NaiveDateTime;

use crate::tidy::TidyRow;

/// Every measurement's value at one timestamp, as shown on hover.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub readings: Vec<TidyRow>,
}

/// Picks the tidy timestamp nearest to `at` (the earlier one on a tie) and collects the rows
/// recorded at exactly that timestamp, in their original order.
pub fn nearest_snapshot(rows: &[TidyRow], at: NaiveDateTime) -> Option<Snapshot> {
    let timestamp = rows
        .iter()
        .map(|row| row.timestamp)
        .min_by_key(|ts| ((*ts - at).abs(), *ts))?;

    let readings = rows
        .iter()
        .filter(|row| row.timestamp == timestamp)
        .cloned()
        .collect();

    Some(Snapshot {
        timestamp,
        readings,
    })
}

/// Snapshot at the most recent timestamp.
pub fn latest_snapshot(rows: &[TidyRow]) -> Option<Snapshot> {
    let latest = rows.iter().map(|row| row.timestamp).max()?;
    nearest_snapshot(rows, latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hm: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2024-06-14 {hm}:00"), "%Y-%m-%d %H:%M:%S")
            .expect("timestamp")
    }

    fn row(hm: &str, measurement: &str, value: f64) -> TidyRow {
        TidyRow {
            timestamp: at(hm),
            measurement: measurement.to_string(),
            value: Some(value),
            annotation: None,
        }
    }

    fn rows() -> Vec<TidyRow> {
        vec![
            row("08:00", "Front", 70.0),
            row("08:10", "Front", 75.0),
            row("08:00", "Target", 70.0),
            row("08:10", "Target", 85.0),
            row("08:20", "Target", 100.0),
        ]
    }

    #[test]
    fn collects_every_series_at_the_nearest_timestamp() {
        let snapshot = nearest_snapshot(&rows(), at("08:12")).expect("snapshot");
        assert_eq!(snapshot.timestamp, at("08:10"));
        let names: Vec<&str> = snapshot
            .readings
            .iter()
            .map(|r| r.measurement.as_str())
            .collect();
        assert_eq!(names, vec!["Front", "Target"]);
    }

    #[test]
    fn ties_resolve_to_the_earlier_timestamp() {
        let snapshot = nearest_snapshot(&rows(), at("08:05")).expect("snapshot");
        assert_eq!(snapshot.timestamp, at("08:00"));
    }

    #[test]
    fn latest_snapshot_uses_last_timestamp() {
        let snapshot = latest_snapshot(&rows()).expect("snapshot");
        assert_eq!(snapshot.timestamp, at("08:20"));
        assert_eq!(snapshot.readings.len(), 1);
    }

    #[test]
    fn empty_rows_have_no_snapshot() {
        assert!(nearest_snapshot(&[], at("08:00")).is_none());
    }
}
