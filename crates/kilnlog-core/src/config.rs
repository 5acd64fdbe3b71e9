use std::path::Path;

use chrono::Duration;
use chrono_tz::Tz;
use kilnlog_parser::{ScheduleLayout, SensorLayout, TimestampParser};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// How absent values in the merged table are filled before reshaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// Keep only what was measured or resampled at each timestamp.
    None,
    /// Carry the last known value forward; leading gaps stay absent.
    Forward,
    /// Take the next known value; trailing gaps stay absent.
    #[default]
    Backward,
    /// Time-weighted linear interpolation between the surrounding known values; both edges
    /// stay absent.
    Interpolate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorsConfig {
    pub timestamp_column: String,
    pub channels: Vec<String>,
    pub annotation_column: Option<String>,
    /// Channel whose tidy rows carry the annotation. Defaults to the first channel.
    pub annotation_channel: Option<String>,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        let layout = SensorLayout::default();
        Self {
            timestamp_column: layout.timestamp_column,
            channels: layout.channels,
            annotation_column: layout.annotation_column,
            annotation_channel: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub timestamp_column: String,
    pub target_column: String,
    /// Measurement name of the target series in tidy output.
    pub label: String,
    pub interval_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let layout = ScheduleLayout::default();
        Self {
            timestamp_column: layout.timestamp_column,
            target_column: layout.target_column,
            label: "Target".to_string(),
            interval_minutes: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub fill: FillPolicy,
    pub fill_annotations: bool,
    /// Drop tidy rows whose value is absent.
    pub drop_missing: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            fill: FillPolicy::Backward,
            fill_annotations: false,
            drop_missing: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// IANA zone naive timestamps are recorded in. UTC when unset.
    pub timezone: Option<String>,
    pub sensors: SensorsConfig,
    pub schedule: ScheduleConfig,
    pub merge: MergeConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|err| PipelineError::Config(format!("failed to parse TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|err| match err {
            PipelineError::Config(message) => {
                PipelineError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_minutes == 0 {
            return Err(PipelineError::Config(
                "schedule.interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.schedule.label.trim().is_empty() {
            return Err(PipelineError::Config(
                "schedule.label must not be empty".to_string(),
            ));
        }
        if self.sensors.channels.contains(&self.schedule.label) {
            return Err(PipelineError::Config(format!(
                "schedule.label '{}' is also a sensor channel",
                self.schedule.label
            )));
        }
        if let Some(channel) = &self.sensors.annotation_channel {
            if self.sensors.annotation_column.is_none() {
                return Err(PipelineError::Config(
                    "sensors.annotation_channel requires sensors.annotation_column".to_string(),
                ));
            }
            if !self.sensors.channels.is_empty() && !self.sensors.channels.contains(channel) {
                return Err(PipelineError::Config(format!(
                    "sensors.annotation_channel '{channel}' is not a listed channel"
                )));
            }
        }
        self.time_zone()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz> {
        match self.timezone.as_deref() {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|err| PipelineError::Config(format!("unknown timezone '{name}': {err}"))),
        }
    }

    pub fn timestamp_parser(&self) -> Result<TimestampParser> {
        Ok(TimestampParser::new(self.time_zone()?))
    }

    pub fn sensor_layout(&self) -> SensorLayout {
        SensorLayout {
            timestamp_column: self.sensors.timestamp_column.clone(),
            channels: self.sensors.channels.clone(),
            annotation_column: self.sensors.annotation_column.clone(),
        }
    }

    pub fn schedule_layout(&self) -> ScheduleLayout {
        ScheduleLayout {
            timestamp_column: self.schedule.timestamp_column.clone(),
            target_column: self.schedule.target_column.clone(),
        }
    }

    pub fn resample_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.schedule.interval_minutes))
    }
}
