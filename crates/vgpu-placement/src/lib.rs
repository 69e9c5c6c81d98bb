//! vGPU placement: device views and host scoring.
//!
//! This crate holds the pure, I/O-free parts of placement: the per-host
//! device inventory the scheduler caches for a cycle, the contracts of
//! the external builder and allocator, and the scoring model.
//!
//! # Components
//!
//! - **`device`**: `DeviceView`, shared `DeviceSnapshot`, builder/allocator traits
//! - **`scorer`**: pack/spread scores, topology adjustment, clamping, ranking
//! - **`error`**: device view and allocation errors

pub mod device;
pub mod error;
pub mod scorer;

pub use device::{Allocator, DeviceInfo, DeviceSnapshot, DeviceView, DeviceViewBuilder};
pub use error::{AllocationError, DeviceError};
pub use scorer::{
    HostScore, MAX_NODE_SCORE, MAX_TOTAL_SCORE, MIN_NODE_SCORE, NEUTRAL_SCORE, ScoreBreakdown,
    clamp_score, rank_hosts, score_view,
};
