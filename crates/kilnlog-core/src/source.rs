use std::path::{Path, PathBuf};

use kilnlog_parser::{parse_sensor_table, SensorLayout, TimestampParser};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Where sensor readings come from. Implementations return an already-materialized table in
/// the parser's sensor frame layout.
pub trait SensorSource {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<DataFrame>;
}

/// A CSV export of the operator's reading log.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    name: String,
    layout: SensorLayout,
    timestamps: TimestampParser,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, layout: SensorLayout, timestamps: TimestampParser) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            layout,
            timestamps,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SensorSource for CsvFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<DataFrame> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|err| PipelineError::SourceUnavailable {
                source_name: self.name.clone(),
                reason: err.to_string(),
            })?;
        let df = parse_sensor_table(&content, &self.layout, &self.timestamps)?;
        debug!(source = self.name.as_str(), rows = df.height(), "fetched sensor table");
        Ok(df)
    }
}

/// Single-entry cache in front of a [`SensorSource`].
///
/// Entries never expire on their own; only [`invalidate`](Self::invalidate) or a forced
/// refresh drops them.
#[derive(Debug)]
pub struct SensorCache<S> {
    source: S,
    cached: Option<DataFrame>,
    fetch_count: usize,
}

impl<S: SensorSource> SensorCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
            fetch_count: 0,
        }
    }

    /// Returns the cached table, fetching it first when the cache is empty or
    /// `force_refresh` is set. A failed fetch leaves the cache empty.
    pub fn fetch(&mut self, force_refresh: bool) -> Result<&DataFrame> {
        if force_refresh {
            warn!(source = self.source.name(), "forcing sensor table refresh");
            self.invalidate();
        }

        if self.cached.is_none() {
            let table = self.source.fetch()?;
            self.fetch_count += 1;
            self.cached = Some(table);
        }

        self.cached
            .as_ref()
            .ok_or_else(|| PipelineError::Processing("sensor cache empty after fetch".to_string()))
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Number of fetches that reached the source.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
