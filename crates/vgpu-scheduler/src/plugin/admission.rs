use tracing::{debug, warn};

use vgpu_core::{VGPU_CORES_RESOURCE, VGPU_NUMBER_RESOURCE};
use vgpu_state::{EventType, Workload};

use crate::error::{SchedulerError, SchedulerResult};
use crate::framework::{CycleState, PreFilterPlugin, Status};

use super::VgpuSchedulerPlugin;

const EVENT_REASON: &str = "FailedFiltering";
const EVENT_ACTION: &str = "Scheduling";

impl VgpuSchedulerPlugin {
    /// Per-container ceilings on core units and device count.
    fn check_device_requests(&self, workload: &Workload) -> SchedulerResult<()> {
        for container in &workload.containers {
            if container.resource(VGPU_CORES_RESOURCE) > self.config.max_core_units {
                return Err(SchedulerError::RequestLimit {
                    container: container.name.clone(),
                    resource: "vGPU cores",
                    limit: self.config.max_core_units,
                });
            }
            if container.resource(VGPU_NUMBER_RESOURCE) > self.config.max_device_number {
                return Err(SchedulerError::RequestLimit {
                    container: container.name.clone(),
                    resource: "vGPU number",
                    limit: self.config.max_device_number,
                });
            }
        }
        Ok(())
    }
}

impl PreFilterPlugin for VgpuSchedulerPlugin {
    fn pre_filter(&self, state: &CycleState, workload: &Workload) -> Status {
        let key = workload.key();
        match self.is_vgpu_workload(state, workload) {
            Ok(true) => {}
            Ok(false) => {
                debug!(workload = %key, "no vGPU requested, skipping device filtering");
                return Status::skip();
            }
            Err(err) => return err.into(),
        }

        if let Err(err) = self.check_device_requests(workload) {
            let message = err.to_string();
            warn!(workload = %key, %message, "rejecting vGPU request");
            self.handle
                .events()
                .record(workload, EventType::Warning, EVENT_REASON, EVENT_ACTION, &message);
            return Status::unresolvable(message);
        }

        Status::success()
    }
}
