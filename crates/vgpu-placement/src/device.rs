//! Per-host device inventory and occupancy.
//!
//! A [`DeviceView`] is built once per (cycle, host) and then frozen into a
//! [`DeviceSnapshot`] that every phase of the cycle shares. Anything that
//! simulates an allocation takes a [`DeviceSnapshot::working_copy`] and
//! mutates that instead, so the shared snapshot never changes.

use std::ops::Deref;
use std::sync::Arc;

use vgpu_state::{Host, Workload};

use crate::error::{AllocationError, DeviceError};

/// Capacity and usage of one physical device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub index: usize,
    pub uuid: String,
    /// Maximum number of vGPU slices the device can be split into.
    pub total_number: i64,
    pub used_number: i64,
    /// Core units, 100 per device.
    pub total_cores: i64,
    pub used_cores: i64,
    /// Device memory in MiB.
    pub total_memory: i64,
    pub used_memory: i64,
    pub healthy: bool,
}

impl DeviceInfo {
    pub fn new(
        index: usize,
        uuid: &str,
        total_number: i64,
        total_cores: i64,
        total_memory: i64,
    ) -> Self {
        Self {
            index,
            uuid: uuid.to_string(),
            total_number,
            used_number: 0,
            total_cores,
            used_cores: 0,
            total_memory,
            used_memory: 0,
            healthy: true,
        }
    }

    pub fn free_number(&self) -> i64 {
        (self.total_number - self.used_number).max(0)
    }

    pub fn free_cores(&self) -> i64 {
        (self.total_cores - self.used_cores).max(0)
    }

    pub fn free_memory(&self) -> i64 {
        (self.total_memory - self.used_memory).max(0)
    }

    /// Mean of slice, core and memory utilization, in `0.0..=1.0`.
    pub fn utilization(&self) -> f64 {
        fn ratio(used: i64, total: i64) -> f64 {
            if total > 0 {
                (used as f64 / total as f64).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        (ratio(self.used_number, self.total_number)
            + ratio(self.used_cores, self.total_cores)
            + ratio(self.used_memory, self.total_memory))
            / 3.0
    }

    /// Take one slice plus `cores` and `memory` from this device.
    pub fn reserve(&mut self, cores: i64, memory: i64) -> Result<(), AllocationError> {
        if !self.healthy {
            return Err(AllocationError::Unsatisfiable(format!(
                "device {} is unhealthy",
                self.uuid
            )));
        }
        if self.free_number() < 1 || self.free_cores() < cores || self.free_memory() < memory {
            return Err(AllocationError::Unsatisfiable(format!(
                "device {} has insufficient free capacity",
                self.uuid
            )));
        }
        self.used_number += 1;
        self.used_cores += cores;
        self.used_memory += memory;
        Ok(())
    }
}

/// Device inventory of a single host.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceView {
    host: String,
    devices: Vec<DeviceInfo>,
    gpu_topology: bool,
}

impl DeviceView {
    pub fn new(host: &str, devices: Vec<DeviceInfo>) -> Self {
        Self {
            host: host.to_string(),
            devices,
            gpu_topology: false,
        }
    }

    /// Mark whether the host reports GPU link topology.
    pub fn with_gpu_topology(mut self, present: bool) -> Self {
        self.gpu_topology = present;
        self
    }

    pub fn name(&self) -> &str {
        &self.host
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn device_mut(&mut self, index: usize) -> Option<&mut DeviceInfo> {
        self.devices.iter_mut().find(|d| d.index == index)
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut DeviceInfo> {
        self.devices.iter_mut()
    }

    pub fn has_gpu_topology(&self) -> bool {
        self.gpu_topology
    }

    /// Mean utilization over healthy devices; `0.0` when there are none.
    pub fn utilization(&self) -> f64 {
        let healthy: Vec<&DeviceInfo> = self.devices.iter().filter(|d| d.healthy).collect();
        if healthy.is_empty() {
            return 0.0;
        }
        healthy.iter().map(|d| d.utilization()).sum::<f64>() / healthy.len() as f64
    }

    /// Freeze this view for sharing across a cycle.
    pub fn snapshot(self) -> DeviceSnapshot {
        DeviceSnapshot(Arc::new(self))
    }
}

/// Immutable, cheaply clonable handle to a cached [`DeviceView`].
#[derive(Debug, Clone)]
pub struct DeviceSnapshot(Arc<DeviceView>);

impl DeviceSnapshot {
    /// Owned copy that may be mutated without affecting the snapshot.
    pub fn working_copy(&self) -> DeviceView {
        (*self.0).clone()
    }

    /// Whether two handles refer to the same cached view.
    pub fn ptr_eq(&self, other: &DeviceSnapshot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for DeviceSnapshot {
    type Target = DeviceView;

    fn deref(&self) -> &DeviceView {
        &self.0
    }
}

/// Builds a host's device view from the host and the workloads bound to it.
pub trait DeviceViewBuilder: Send + Sync {
    fn build(&self, host: &Host, workloads: &[Workload]) -> Result<DeviceView, DeviceError>;
}

/// Device allocation algorithm.
///
/// On success returns a copy of the workload annotated with the chosen
/// pre-allocation descriptor; `view` reflects the reservation.
pub trait Allocator: Send + Sync {
    fn allocate(
        &self,
        view: &mut DeviceView,
        workload: &Workload,
    ) -> Result<Workload, AllocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(index: usize) -> DeviceInfo {
        DeviceInfo::new(index, &format!("GPU-{index:04}"), 4, 100, 8192)
    }

    #[test]
    fn reserve_consumes_capacity() {
        let mut d = gpu(0);
        d.reserve(50, 2048).unwrap();
        assert_eq!(d.free_number(), 3);
        assert_eq!(d.free_cores(), 50);
        assert_eq!(d.free_memory(), 6144);
    }

    #[test]
    fn reserve_rejects_overcommit() {
        let mut d = gpu(0);
        d.reserve(80, 0).unwrap();
        assert!(d.reserve(30, 0).is_err());
        assert_eq!(d.used_cores, 80);
    }

    #[test]
    fn reserve_rejects_unhealthy_device() {
        let mut d = gpu(0);
        d.healthy = false;
        assert!(matches!(
            d.reserve(0, 0),
            Err(AllocationError::Unsatisfiable(_))
        ));
    }

    #[test]
    fn utilization_averages_dimensions() {
        let mut d = gpu(0);
        assert_eq!(d.utilization(), 0.0);
        d.used_number = 4;
        d.used_cores = 100;
        d.used_memory = 8192;
        assert_eq!(d.utilization(), 1.0);
        d.used_memory = 0;
        assert!((d.utilization() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn view_utilization_ignores_unhealthy() {
        let mut busy = gpu(0);
        busy.used_number = 4;
        busy.used_cores = 100;
        busy.used_memory = 8192;
        let mut broken = gpu(1);
        broken.healthy = false;

        let view = DeviceView::new("n1", vec![busy, broken]);
        assert_eq!(view.utilization(), 1.0);
        assert_eq!(DeviceView::new("empty", vec![]).utilization(), 0.0);
    }

    #[test]
    fn working_copy_does_not_touch_snapshot() {
        let snapshot = DeviceView::new("n1", vec![gpu(0)]).snapshot();
        let mut copy = snapshot.working_copy();
        copy.device_mut(0).unwrap().reserve(100, 8192).unwrap();

        assert_eq!(snapshot.devices()[0].used_cores, 0);
        assert_eq!(copy.devices()[0].used_cores, 100);
    }

    #[test]
    fn snapshot_clones_share_storage() {
        let a = DeviceView::new("n1", vec![gpu(0)]).with_gpu_topology(true).snapshot();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(b.has_gpu_topology());
        assert_eq!(b.name(), "n1");
    }
}
