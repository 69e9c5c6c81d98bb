//! vgpu-scheduler: scheduler plugin for fractional GPU workloads.
//!
//! Places workloads that request vGPU slices (device count, core units,
//! device memory) onto hosts. The plugin plugs into a host scheduling
//! runtime through five phases and records its decision on the workload
//! as labels and annotations that the node-side device agents consume.
//!
//! # Architecture
//!
//! ```text
//! schedule_one (per workload, fresh CycleState)
//!   ├── pre_filter  memoize TotalRequestedDevices, skip or validate limits
//!   ├── filter      per host: capacity → memory policy → allocation on a
//!   │               cloned DeviceView → PreAllocation_<host>
//!   ├── pre_score   skip device-less workloads
//!   ├── score       per host: pack/spread ± topology, clamped
//!   └── bind        CommitGate (process-wide, 30ms floor)
//!                     ├── patch metadata (retried with backoff)
//!                     ├── bind to host
//!                     └── on bind failure: mark workload failed
//! ```
//!
//! Device inventory and the allocation algorithm are supplied by the
//! caller through [`vgpu_placement::DeviceViewBuilder`] and
//! [`vgpu_placement::Allocator`]; cluster writes go through
//! [`vgpu_state::WorkloadStore`].

pub mod commit;
pub mod config;
pub mod error;
pub mod framework;
pub mod plugin;
pub mod retry;

pub use commit::CommitGate;
pub use config::PluginConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use framework::{
    BindPlugin, Code, CycleState, FilterPlugin, Handle, Plugin, PreFilterPlugin, PreScorePlugin,
    ScheduleOutcome, SchedulerPlugin, ScorePlugin, Status, schedule_one, select_host,
};
pub use plugin::{AcceptAllMemoryPolicy, MemoryPolicyCheck, PreAllocation, VgpuSchedulerPlugin};
pub use retry::{RetryPolicy, retry_on_error};
