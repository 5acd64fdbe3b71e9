use serde::{Deserialize, Serialize};

/// Which source columns make up the sensor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLayout {
    pub timestamp_column: String,
    /// Channel headers to keep, in plotting order. Empty keeps every column
    /// other than the timestamp and annotation columns.
    pub channels: Vec<String>,
    pub annotation_column: Option<String>,
}

impl Default for SensorLayout {
    fn default() -> Self {
        Self {
            timestamp_column: "Timestamp".to_string(),
            channels: Vec::new(),
            annotation_column: None,
        }
    }
}

/// Which source columns hold the planned firing curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLayout {
    pub timestamp_column: String,
    pub target_column: String,
}

impl Default for ScheduleLayout {
    fn default() -> Self {
        Self {
            timestamp_column: "Time".to_string(),
            target_column: "Target Temperature".to_string(),
        }
    }
}
