use std::path::Path;

use kilnlog_parser::schema::{ANNOTATION, TARGET};
use kilnlog_parser::{parse_schedule, sensor_channels};
use polars::prelude::DataFrame;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::merge::{fill_annotations, fill_gaps, join_readings};
use crate::resample::resample_schedule;
use crate::source::{SensorCache, SensorSource};
use crate::tidy::{tidy_rows, to_tidy, TidyLayout, TidyRow};

/// Every intermediate table of one run, so callers can inspect the wide view as well as the
/// plot-ready one.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub resampled: DataFrame,
    pub merged: DataFrame,
    pub tidy: DataFrame,
}

impl PipelineOutput {
    pub fn rows(&self) -> Result<Vec<TidyRow>> {
        tidy_rows(&self.tidy)
    }
}

/// Aligns sensor readings with the target schedule and reshapes the result for plotting.
///
/// Resamples the schedule onto the configured grid, full-outer-joins it with the readings,
/// sorts by timestamp, fills gaps per `config.merge.fill` and pivots to tidy rows. Fails as a
/// whole; nothing is returned for a partially processed batch.
pub fn run_pipeline(
    sensors: &DataFrame,
    schedule: &DataFrame,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let channels = sensor_channels(sensors);
    if channels.iter().any(|c| *c == config.schedule.label) {
        return Err(PipelineError::Config(format!(
            "target label '{}' is also a sensor channel",
            config.schedule.label
        )));
    }
    let annotation_channel = resolve_annotation_channel(sensors, &channels, config)?;

    let resampled = resample_schedule(schedule, config.resample_interval())?;
    let joined = join_readings(sensors, &resampled)?;

    let mut fields = channels.clone();
    fields.push(TARGET.to_string());
    let mut merged = fill_gaps(&joined, &fields, config.merge.fill)?;
    if config.merge.fill_annotations && annotation_channel.is_some() {
        merged = fill_annotations(&merged, config.merge.fill)?;
    }

    let layout = TidyLayout {
        channels: &channels,
        target_label: &config.schedule.label,
        annotation_channel: annotation_channel.as_deref(),
        drop_missing: config.merge.drop_missing,
    };
    let tidy = to_tidy(&merged, &layout)?;

    info!(
        sensor_rows = sensors.height(),
        schedule_rows = schedule.height(),
        merged_rows = merged.height(),
        tidy_rows = tidy.height(),
        fill = ?config.merge.fill,
        "pipeline complete"
    );

    Ok(PipelineOutput {
        resampled,
        merged,
        tidy,
    })
}

fn resolve_annotation_channel(
    sensors: &DataFrame,
    channels: &[String],
    config: &PipelineConfig,
) -> Result<Option<String>> {
    if sensors.column(ANNOTATION).is_err() {
        return Ok(None);
    }
    match &config.sensors.annotation_channel {
        Some(channel) if channels.contains(channel) => Ok(Some(channel.clone())),
        Some(channel) => Err(PipelineError::Config(format!(
            "annotation channel '{channel}' is not among the sensor channels {channels:?}"
        ))),
        None => Ok(channels.first().cloned()),
    }
}

/// One dashboard session: the schedule is read once, sensor readings go through an explicit
/// cache, and every render reruns the pipeline.
pub struct Dashboard<S> {
    config: PipelineConfig,
    schedule: DataFrame,
    cache: SensorCache<S>,
}

impl<S: SensorSource> Dashboard<S> {
    pub fn new(config: PipelineConfig, schedule: DataFrame, source: S) -> Self {
        Self {
            config,
            schedule,
            cache: SensorCache::new(source),
        }
    }

    pub fn from_schedule_file(config: PipelineConfig, schedule_path: &Path, source: S) -> Result<Self> {
        let schedule = read_schedule(&config, schedule_path)?;
        Ok(Self::new(config, schedule, source))
    }

    pub fn render(&mut self, force_refresh: bool) -> Result<PipelineOutput> {
        let sensors = self.cache.fetch(force_refresh)?;
        run_pipeline(sensors, &self.schedule, &self.config)
    }

    pub fn clear_cache(&mut self) {
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &SensorCache<S> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Reads and parses a target schedule file with the configured layout and time zone.
pub fn read_schedule(config: &PipelineConfig, path: &Path) -> Result<DataFrame> {
    let content = std::fs::read_to_string(path)?;
    let timestamps = config.timestamp_parser()?;
    Ok(parse_schedule(&content, &config.schedule_layout(), &timestamps)?)
}
