//! Phase contracts a scheduler plugin implements.
//!
//! Every phase receives the cycle's [`CycleState`]. Filter and score are
//! invoked concurrently for different hosts, so implementations must be
//! `Sync` and must only touch per-host state keys for the host they were
//! given.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use vgpu_state::{HostInfo, Workload};

use super::cycle_state::CycleState;
use super::status::Status;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Runs once per cycle before any host is examined.
pub trait PreFilterPlugin: Plugin {
    fn pre_filter(&self, state: &CycleState, workload: &Workload) -> Status;
}

/// Decides whether one host can run the workload.
pub trait FilterPlugin: Plugin {
    fn filter(&self, state: &CycleState, workload: &Workload, host: &HostInfo) -> Status;
}

/// Runs once per cycle over the hosts that passed filtering.
pub trait PreScorePlugin: Plugin {
    fn pre_score(&self, state: &CycleState, workload: &Workload, hosts: &[HostInfo]) -> Status;
}

/// Ranks one feasible host. A non-success status aborts the cycle.
pub trait ScorePlugin: Plugin {
    fn score(&self, state: &CycleState, workload: &Workload, host: &str) -> Result<i64, Status>;
}

/// Commits the placement decision to the cluster store.
#[async_trait]
pub trait BindPlugin: Plugin {
    async fn bind(
        &self,
        cancel: &CancellationToken,
        state: &CycleState,
        workload: &Workload,
        host: &str,
    ) -> Status;
}

/// A plugin taking part in every phase.
pub trait SchedulerPlugin:
    PreFilterPlugin + FilterPlugin + PreScorePlugin + ScorePlugin + BindPlugin
{
}

impl<T> SchedulerPlugin for T where
    T: PreFilterPlugin + FilterPlugin + PreScorePlugin + ScorePlugin + BindPlugin
{
}
