use tracing::{debug, error, info};

use vgpu_core::{PRE_ALLOCATED_ANNOTATION, VGPU_NUMBER_RESOURCE};
use vgpu_placement::DeviceSnapshot;
use vgpu_state::{Host, HostInfo, Workload};

use crate::error::{SchedulerError, SchedulerResult};
use crate::framework::{CycleState, FilterPlugin, Status};

use super::VgpuSchedulerPlugin;
use super::state::{self, PreAllocation};

/// Host-level memory-sharing policy. `Err` carries the rejection message.
pub trait MemoryPolicyCheck: Send + Sync {
    fn check(&self, workload: &Workload, host: &Host) -> Result<(), String>;
}

impl<F> MemoryPolicyCheck for F
where
    F: Fn(&Workload, &Host) -> Result<(), String> + Send + Sync,
{
    fn check(&self, workload: &Workload, host: &Host) -> Result<(), String> {
        self(workload, host)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllMemoryPolicy;

impl MemoryPolicyCheck for AcceptAllMemoryPolicy {
    fn check(&self, _workload: &Workload, _host: &Host) -> Result<(), String> {
        Ok(())
    }
}

impl VgpuSchedulerPlugin {
    fn filter_host(&self, state: &CycleState, workload: &Workload, info: &HostInfo) -> Status {
        let host = info.name();

        let allocatable = info.host.allocatable(VGPU_NUMBER_RESOURCE);
        if allocatable <= 0 {
            debug!(host, "host does not have GPU");
            return Status::unschedulable("host does not have GPU");
        }

        let requested = match self.total_requested_devices(state, workload) {
            Ok(n) => n,
            Err(err) => return err.into(),
        };
        if requested > allocatable {
            debug!(host, requested, allocatable, "insufficient GPU on the host");
            return Status::unschedulable("insufficient GPU on the host");
        }

        if let Err(message) = self.memory_policy.check(workload, &info.host) {
            debug!(host, %message, "memory policy rejected host");
            return Status::unschedulable(message);
        }

        let snapshot = match self.device_view(state, info) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(host, %err, "building device view failed");
                return err.into();
            }
        };

        let mut view = snapshot.working_copy();
        let allocated = match self.allocator.allocate(&mut view, workload) {
            Ok(allocated) => allocated,
            Err(err) => {
                info!(host, workload = %workload.key(), %err, "device allocation failed");
                return Status::unschedulable(err.to_string());
            }
        };

        match allocated.annotation(PRE_ALLOCATED_ANNOTATION) {
            Some(descriptor) if !descriptor.is_empty() => {
                debug!(host, descriptor, "pre-allocated devices");
                state::write_pre_allocation(state, host, PreAllocation::new(descriptor));
                Status::success()
            }
            _ => SchedulerError::EmptyPreAllocation(host.to_string()).into(),
        }
    }

    /// Cached view for the host, built on first use in this cycle.
    fn device_view(&self, state: &CycleState, info: &HostInfo) -> SchedulerResult<DeviceSnapshot> {
        if let Some(snapshot) = state::read_device_view(state, info.name())? {
            return Ok(snapshot);
        }
        let snapshot = self.builder.build(&info.host, &info.workloads)?.snapshot();
        state::write_device_view(state, info.name(), snapshot.clone());
        Ok(snapshot)
    }
}

impl FilterPlugin for VgpuSchedulerPlugin {
    fn filter(&self, state: &CycleState, workload: &Workload, host: &HostInfo) -> Status {
        let status = self.filter_host(state, workload, host);
        if !status.is_success() {
            state::invalidate_host(state, host.name());
        }
        status
    }
}
