use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, TimeZone as _, Utc};
use chrono_tz::Tz;

use crate::errors::ParserError;

static NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

static OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Normalizes timestamp text to UTC microseconds.
///
/// Values carrying an explicit offset are converted directly; naive values are read as wall
/// clock time in `zone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampParser {
    zone: Tz,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimestampParser {
    pub fn utc() -> Self {
        Self { zone: Tz::UTC }
    }

    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn parse_micros(&self, value: &str) -> Result<i64, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("empty timestamp".to_string());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc).timestamp_micros());
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
                return Ok(dt.with_timezone(&Utc).timestamp_micros());
            }
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| format!("invalid timestamp '{trimmed}'"))?;

        self.localize(naive)
    }

    /// Same as [`parse_micros`](Self::parse_micros), returned as a naive UTC datetime.
    pub fn parse(&self, value: &str) -> Result<NaiveDateTime, String> {
        let micros = self.parse_micros(value)?;
        DateTime::<Utc>::from_timestamp_micros(micros)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| format!("timestamp '{}' out of range", value.trim()))
    }

    pub(crate) fn parse_field(
        &self,
        table: &'static str,
        value: &str,
        line_index: usize,
    ) -> Result<i64, ParserError> {
        self.parse_micros(value)
            .map_err(|message| ParserError::DataRow {
                table,
                line_index,
                message,
            })
    }

    fn localize(&self, naive: NaiveDateTime) -> Result<i64, String> {
        let offset_seconds = match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.offset().fix().local_minus_utc(),
            // Fall-back overlap: take the earlier of the two instants.
            LocalResult::Ambiguous(a, b) => {
                let off_a = a.offset().fix().local_minus_utc();
                let off_b = b.offset().fix().local_minus_utc();
                off_a.max(off_b)
            }
            LocalResult::None => {
                return Err(format!(
                    "local time {naive} does not exist in {}",
                    self.zone.name()
                ));
            }
        };

        let utc = naive - chrono::Duration::seconds(i64::from(offset_seconds));
        Ok(utc.and_utc().timestamp_micros())
    }
}
