//! Column names shared by every frame the parser hands out.

pub const TIMESTAMP: &str = "timestamp";
pub const TARGET: &str = "target";
pub const ANNOTATION: &str = "annotation";

/// Names the parser assigns itself; source headers may not reuse them as channels.
pub const RESERVED_COLUMNS: [&str; 3] = [TIMESTAMP, TARGET, ANNOTATION];

pub const SENSOR_TABLE: &str = "sensor table";
pub const TARGET_SCHEDULE: &str = "target schedule";
