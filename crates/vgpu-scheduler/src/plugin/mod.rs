//! The vGPU scheduler plugin.
//!
//! One [`VgpuSchedulerPlugin`] is created per scheduler process and
//! implements every phase:
//!
//! | phase     | module      | outcome                                         |
//! |-----------|-------------|-------------------------------------------------|
//! | PreFilter | `admission` | skip device-less workloads, reject bad requests |
//! | Filter    | `filter`    | capacity, memory policy, allocation simulation  |
//! | PreScore  | `prescore`  | skip device-less workloads                      |
//! | Score     | `score`     | pack/spread policy with topology adjustment     |
//! | Bind      | `bind`      | serialized metadata patch and host binding      |
//!
//! The plugin owns the commit gate, so all binds issued through one
//! instance are serialized.

mod admission;
mod bind;
mod filter;
mod prescore;
mod score;
pub mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;

use vgpu_core::VGPU_NUMBER_RESOURCE;
use vgpu_placement::{Allocator, DeviceViewBuilder};
use vgpu_state::Workload;

use crate::commit::CommitGate;
use crate::config::PluginConfig;
use crate::error::SchedulerResult;
use crate::framework::{CycleState, Handle, Plugin};

pub use filter::{AcceptAllMemoryPolicy, MemoryPolicyCheck};
pub use state::PreAllocation;

pub const NAME: &str = "VGPUSchedulerPlugin";

pub struct VgpuSchedulerPlugin {
    config: PluginConfig,
    handle: Handle,
    builder: Arc<dyn DeviceViewBuilder>,
    allocator: Arc<dyn Allocator>,
    memory_policy: Arc<dyn MemoryPolicyCheck>,
    commit_gate: CommitGate,
}

impl VgpuSchedulerPlugin {
    pub fn new(
        config: PluginConfig,
        handle: Handle,
        builder: Arc<dyn DeviceViewBuilder>,
        allocator: Arc<dyn Allocator>,
    ) -> Self {
        info!(
            max_device_number = config.max_device_number,
            max_core_units = config.max_core_units,
            min_commit_interval_ms = config.min_commit_interval.as_millis() as u64,
            gpu_topology = config.gpu_topology,
            "vGPU scheduler plugin initialized"
        );
        let commit_gate = CommitGate::new(config.min_commit_interval);
        Self {
            config,
            handle,
            builder,
            allocator,
            memory_policy: Arc::new(AcceptAllMemoryPolicy),
            commit_gate,
        }
    }

    pub fn with_memory_policy(mut self, policy: Arc<dyn MemoryPolicyCheck>) -> Self {
        self.memory_policy = policy;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Devices requested across all containers, computed once per cycle.
    fn total_requested_devices(
        &self,
        state: &CycleState,
        workload: &Workload,
    ) -> SchedulerResult<i64> {
        if let Some(total) = state::read_total_request(state)? {
            return Ok(total);
        }
        let total = workload.total_resource(VGPU_NUMBER_RESOURCE);
        state::write_total_request(state, total);
        Ok(total)
    }

    fn is_vgpu_workload(&self, state: &CycleState, workload: &Workload) -> SchedulerResult<bool> {
        Ok(self.total_requested_devices(state, workload)? > 0)
    }
}

impl Plugin for VgpuSchedulerPlugin {
    fn name(&self) -> &str {
        NAME
    }
}
