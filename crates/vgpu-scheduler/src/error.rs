//! Scheduler error types.

use thiserror::Error;

use vgpu_placement::DeviceError;
use vgpu_state::StoreError;

use crate::framework::CycleStateError;

/// Errors that can occur inside a scheduling phase.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("container {container} requests {resource} exceeding limit, maxLimit: {limit}")]
    RequestLimit {
        container: String,
        resource: &'static str,
        limit: i64,
    },

    #[error("device view for host {0} not found in cycle state")]
    MissingDeviceView(String),

    #[error("getting pre-allocated devices for host {0} failed")]
    MissingPreAllocation(String),

    #[error("allocator returned no pre-allocation for host {0}")]
    EmptyPreAllocation(String),

    #[error("cycle state error: {0}")]
    CycleState(#[from] CycleStateError),

    #[error("device view error: {0}")]
    Device(#[from] DeviceError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
