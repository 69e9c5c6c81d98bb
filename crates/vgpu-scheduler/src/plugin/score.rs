use tracing::{debug, error};

use vgpu_core::{
    DEVICE_TOPOLOGY_MODE_ANNOTATION, NODE_SCHEDULER_POLICY_ANNOTATION, NodePolicy, TopologyMode,
};
use vgpu_placement::{MIN_NODE_SCORE, score_view};
use vgpu_state::Workload;

use crate::error::SchedulerError;
use crate::framework::{CycleState, ScorePlugin, Status};

use super::VgpuSchedulerPlugin;
use super::state;

impl ScorePlugin for VgpuSchedulerPlugin {
    fn score(&self, state: &CycleState, workload: &Workload, host: &str) -> Result<i64, Status> {
        if !self.is_vgpu_workload(state, workload)? {
            return Ok(MIN_NODE_SCORE);
        }

        let Some(view) = state::read_device_view(state, host).map_err(SchedulerError::from)? else {
            error!(host, workload = %workload.key(), "device view missing at scoring");
            return Err(SchedulerError::MissingDeviceView(host.to_string()).into());
        };

        let policy = workload
            .annotation(NODE_SCHEDULER_POLICY_ANNOTATION)
            .and_then(NodePolicy::parse);
        let topology = if self.config.gpu_topology {
            workload
                .annotation(DEVICE_TOPOLOGY_MODE_ANNOTATION)
                .and_then(TopologyMode::parse)
        } else {
            None
        };

        let breakdown = score_view(&view, policy, topology);
        debug!(
            host,
            policy = ?breakdown.policy,
            base = breakdown.base,
            topology = breakdown.topology,
            score = breakdown.score,
            "scored host"
        );
        Ok(breakdown.score)
    }
}
