pub mod config;
pub mod types;

pub use config::{SchedulerConfig, parse_duration};
pub use types::*;
