pub mod errors;
mod common;
pub mod model;
mod schedule;
pub mod schema;
mod sensors;
mod timestamp;

pub use errors::ParserError;
pub use model::{ScheduleLayout, SensorLayout};
pub use schedule::parse_schedule;
pub use sensors::{parse_sensor_table, sensor_channels};
pub use timestamp::TimestampParser;

#[cfg(test)]
mod tests;
