use tracing::debug;

use vgpu_state::{HostInfo, Workload};

use crate::framework::{CycleState, PreScorePlugin, Status};

use super::VgpuSchedulerPlugin;

impl PreScorePlugin for VgpuSchedulerPlugin {
    fn pre_score(&self, state: &CycleState, workload: &Workload, _hosts: &[HostInfo]) -> Status {
        match self.is_vgpu_workload(state, workload) {
            Ok(true) => Status::success(),
            Ok(false) => {
                debug!(workload = %workload.key(), "no vGPU requested, skipping host scoring");
                Status::skip()
            }
            Err(err) => err.into(),
        }
    }
}
