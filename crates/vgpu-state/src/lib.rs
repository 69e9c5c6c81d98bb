//! vgpu-state: workload and host model plus the store contract.
//!
//! The scheduler treats the cluster store as an external collaborator:
//! it reads `Workload` / `Host` snapshots and writes back through the
//! [`WorkloadStore`] trait (metadata patch, bind).
//!
//! # Architecture
//!
//! ```text
//! WorkloadStore (async trait)
//!   ├── patch_metadata(key, MetadataPatch)   labels + annotations merge
//!   └── bind(Binding)                        commit workload → host
//! MemoryStore                                in-memory impl, scripted failures
//! EventRecorder                              diagnostic events (tracing / memory)
//! ```
//!
//! Store errors carry a retriability classification
//! ([`StoreError::is_retriable`]) that callers use to drive retries.

pub mod error;
pub mod events;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use events::{Event, EventRecorder, EventType, MemoryEventRecorder, TracingEventRecorder};
pub use store::{MemoryStore, WorkloadStore};
pub use types::*;
