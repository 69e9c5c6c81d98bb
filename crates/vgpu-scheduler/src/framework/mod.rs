//! Scheduling framework surface: phase traits, statuses, cycle state, and
//! the single-workload cycle runner.

pub mod cycle_state;
pub mod handle;
pub mod interface;
pub mod runner;
pub mod status;

pub use cycle_state::{CycleState, CycleStateError, StateKey};
pub use handle::Handle;
pub use interface::{
    BindPlugin, FilterPlugin, Plugin, PreFilterPlugin, PreScorePlugin, SchedulerPlugin, ScorePlugin,
};
pub use runner::{HostRejection, PARALLELISM, ScheduleOutcome, schedule_one, select_host};
pub use status::{Code, Status};
