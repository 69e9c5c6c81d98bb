//! Error types for device views and allocation.

use thiserror::Error;

/// Building a host's device view failed. Signals an infrastructure fault,
/// not an infeasible placement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid device inventory on host {host}: {reason}")]
    Inventory { host: String, reason: String },

    #[error("device view error: {0}")]
    Other(String),
}

/// The allocation algorithm could not satisfy a workload on a host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("{0}")]
    Unsatisfiable(String),
}
