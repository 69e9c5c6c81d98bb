//! Shared names and enums used across the vGPU scheduler crates.

use serde::{Deserialize, Serialize};

/// Extended resource carrying the number of vGPU devices requested.
pub const VGPU_NUMBER_RESOURCE: &str = "nvidia.com/vgpu-number";

/// Extended resource carrying the fraction of device cores requested (0-100).
pub const VGPU_CORES_RESOURCE: &str = "nvidia.com/vgpu-cores";

/// Extended resource carrying device memory requested, in MiB.
pub const VGPU_MEMORY_RESOURCE: &str = "nvidia.com/vgpu-memory";

/// One full device expressed in core units.
pub const HUNDRED_CORE: i64 = 100;

/// Default ceiling on the number of devices one container may request.
pub const MAX_DEVICE_NUMBER: i64 = 16;

/// Label recording where a workload is in the assignment lifecycle.
pub const ASSIGNED_PHASE_LABEL: &str = "vgpu-manager.io/assigned-phase";

/// Annotation holding the predicate timestamp (nanoseconds, or [`PREDICATE_TIME_SENTINEL`]).
pub const PREDICATE_TIME_ANNOTATION: &str = "vgpu-manager.io/predicate-time";

/// Annotation holding the host chosen at predicate time.
pub const PREDICATE_NODE_ANNOTATION: &str = "vgpu-manager.io/predicate-node";

/// Annotation holding the pre-allocation descriptor chosen during filtering.
pub const PRE_ALLOCATED_ANNOTATION: &str = "vgpu-manager.io/pre-allocated";

/// Workload-declared host placement policy (`pack` or `spread`).
pub const NODE_SCHEDULER_POLICY_ANNOTATION: &str = "vgpu-manager.io/node-scheduler-policy";

/// Workload-declared device topology mode (`link`).
pub const DEVICE_TOPOLOGY_MODE_ANNOTATION: &str = "vgpu-manager.io/device-topology-mode";

/// Predicate timestamp meaning "no real predicate time applies".
pub const PREDICATE_TIME_SENTINEL: u64 = u64::MAX;

/// Value of [`ASSIGNED_PHASE_LABEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignPhase {
    Succeeded,
    Allocating,
    Failed,
}

impl AssignPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignPhase::Succeeded => "succeeded",
            AssignPhase::Allocating => "allocating",
            AssignPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AssignPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host placement policy declared by a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePolicy {
    /// Prefer fuller hosts (consolidation).
    Pack,
    /// Prefer emptier hosts.
    Spread,
}

impl NodePolicy {
    /// Case-insensitive parse; unrecognized values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("pack") {
            Some(NodePolicy::Pack)
        } else if value.eq_ignore_ascii_case("spread") {
            Some(NodePolicy::Spread)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodePolicy::Pack => "pack",
            NodePolicy::Spread => "spread",
        }
    }
}

/// Device topology mode declared by a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    /// Devices should be connected by a GPU link.
    Link,
}

impl TopologyMode {
    /// Exact, case-insensitive match against the recognized modes.
    pub fn parse(value: &str) -> Option<Self> {
        value.eq_ignore_ascii_case("link").then_some(TopologyMode::Link)
    }
}
