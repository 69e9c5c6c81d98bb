//! Typed accessors for the plugin's cycle state entries.

use std::fmt;

use vgpu_placement::DeviceSnapshot;

use crate::framework::{CycleState, CycleStateError, StateKey};

pub const TOTAL_REQUESTED_DEVICES: StateKey<i64> = StateKey::new("TotalRequestedDevices");

/// Opaque device assignment chosen by the allocator during filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreAllocation(String);

impl PreAllocation {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn device_view_key(host: &str) -> StateKey<DeviceSnapshot> {
    StateKey::owned(format!("DeviceView_{host}"))
}

pub fn pre_allocation_key(host: &str) -> StateKey<PreAllocation> {
    StateKey::owned(format!("PreAllocation_{host}"))
}

pub fn read_total_request(state: &CycleState) -> Result<Option<i64>, CycleStateError> {
    state.read(&TOTAL_REQUESTED_DEVICES)
}

pub fn write_total_request(state: &CycleState, total: i64) {
    state.write(&TOTAL_REQUESTED_DEVICES, total);
}

pub fn read_device_view(
    state: &CycleState,
    host: &str,
) -> Result<Option<DeviceSnapshot>, CycleStateError> {
    state.read(&device_view_key(host))
}

pub fn write_device_view(state: &CycleState, host: &str, view: DeviceSnapshot) {
    state.write(&device_view_key(host), view);
}

pub fn read_pre_allocation(
    state: &CycleState,
    host: &str,
) -> Result<Option<PreAllocation>, CycleStateError> {
    state.read(&pre_allocation_key(host))
}

pub fn write_pre_allocation(state: &CycleState, host: &str, allocation: PreAllocation) {
    state.write(&pre_allocation_key(host), allocation);
}

/// Drop both per-host entries so a retried cycle rebuilds them.
pub fn invalidate_host(state: &CycleState, host: &str) {
    state.delete(&device_view_key(host));
    state.delete(&pre_allocation_key(host));
}
