pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod resample;
pub mod snapshot;
pub mod source;
pub mod tidy;
mod time;

pub use config::{FillPolicy, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, Dashboard, PipelineOutput};
pub use snapshot::{nearest_snapshot, Snapshot};
pub use source::{CsvFileSource, SensorCache, SensorSource};
pub use tidy::TidyRow;
