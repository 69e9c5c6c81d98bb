//! Collaborator stubs shared by the plugin's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vgpu_core::{
    PRE_ALLOCATED_ANNOTATION, VGPU_CORES_RESOURCE, VGPU_MEMORY_RESOURCE, VGPU_NUMBER_RESOURCE,
};
use vgpu_placement::{
    AllocationError, Allocator, DeviceError, DeviceInfo, DeviceView, DeviceViewBuilder,
};
use vgpu_state::{Container, Host, HostInfo, MemoryEventRecorder, MemoryStore, Workload};

use super::VgpuSchedulerPlugin;
use crate::config::PluginConfig;
use crate::framework::Handle;

pub const DEVICE_MEMORY: i64 = 8192;
pub const TOPOLOGY_LABEL: &str = "test/gpu-topology";

pub fn cpu_workload(name: &str) -> Workload {
    Workload::new("default", name).with_container(Container::new("default"))
}

pub fn vgpu_workload(name: &str, devices: i64, cores: i64) -> Workload {
    Workload::new("default", name).with_container(
        Container::new("default")
            .with_limit(VGPU_NUMBER_RESOURCE, devices)
            .with_limit(VGPU_CORES_RESOURCE, cores)
            .with_limit(VGPU_MEMORY_RESOURCE, 1024),
    )
}

pub fn gpu_host(name: &str, devices: i64) -> HostInfo {
    gpu_host_with_cores(name, devices, 100)
}

/// `devices` single-slice devices with `cores` each.
pub fn gpu_host_with_cores(name: &str, devices: i64, cores: i64) -> HostInfo {
    HostInfo::new(
        Host::new(name)
            .with_allocatable(VGPU_NUMBER_RESOURCE, devices)
            .with_allocatable(VGPU_CORES_RESOURCE, devices * cores),
    )
}

/// Greedy first-fit placement of every container onto `view`.
fn place(view: &mut DeviceView, workload: &Workload) -> Result<String, AllocationError> {
    let mut descriptors = Vec::new();
    for container in &workload.containers {
        let mut remaining = container.resource(VGPU_NUMBER_RESOURCE);
        if remaining <= 0 {
            continue;
        }
        let cores = container.resource(VGPU_CORES_RESOURCE);
        let memory = container.resource(VGPU_MEMORY_RESOURCE);
        let mut parts = Vec::new();
        for device in view.devices_mut() {
            if remaining == 0 {
                break;
            }
            if device.reserve(cores, memory).is_ok() {
                parts.push(format!("{}_{}_{}_{}", device.index, device.uuid, cores, memory));
                remaining -= 1;
            }
        }
        if remaining > 0 {
            return Err(AllocationError::Unsatisfiable(format!(
                "insufficient vGPU resources for container {}",
                container.name
            )));
        }
        descriptors.push(format!("{}[{}]", container.name, parts.join(",")));
    }
    Ok(descriptors.join(";"))
}

#[derive(Default)]
pub struct StubBuilder {
    calls: AtomicUsize,
    fail: bool,
}

impl StubBuilder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeviceViewBuilder for StubBuilder {
    fn build(&self, host: &Host, workloads: &[Workload]) -> Result<DeviceView, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeviceError::Inventory {
                host: host.name.clone(),
                reason: "device registry unavailable".into(),
            });
        }
        let count = host.allocatable(VGPU_NUMBER_RESOURCE).max(0);
        let cores = if count > 0 { host.allocatable(VGPU_CORES_RESOURCE) / count } else { 0 };
        let devices = (0..count as usize)
            .map(|i| DeviceInfo::new(i, &format!("GPU-{i:04}"), 1, cores, DEVICE_MEMORY))
            .collect();
        let mut view = DeviceView::new(&host.name, devices)
            .with_gpu_topology(host.labels.contains_key(TOPOLOGY_LABEL));
        for workload in workloads {
            place(&mut view, workload).map_err(|err| DeviceError::Other(err.to_string()))?;
        }
        Ok(view)
    }
}

pub struct GreedyAllocator;

impl Allocator for GreedyAllocator {
    fn allocate(
        &self,
        view: &mut DeviceView,
        workload: &Workload,
    ) -> Result<Workload, AllocationError> {
        let descriptor = place(view, workload)?;
        let mut allocated = workload.clone();
        allocated
            .annotations
            .insert(PRE_ALLOCATED_ANNOTATION.to_string(), descriptor);
        Ok(allocated)
    }
}

/// Succeeds without annotating the workload.
pub struct SilentAllocator;

impl Allocator for SilentAllocator {
    fn allocate(
        &self,
        _view: &mut DeviceView,
        workload: &Workload,
    ) -> Result<Workload, AllocationError> {
        Ok(workload.clone())
    }
}

pub struct Harness {
    pub plugin: VgpuSchedulerPlugin,
    pub builder: Arc<StubBuilder>,
    pub events: MemoryEventRecorder,
    pub store: MemoryStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(test_config(), StubBuilder::default(), Arc::new(GreedyAllocator))
    }

    pub fn with_config(config: PluginConfig) -> Self {
        Self::build(config, StubBuilder::default(), Arc::new(GreedyAllocator))
    }

    pub fn with_failing_builder() -> Self {
        let builder = StubBuilder {
            fail: true,
            ..StubBuilder::default()
        };
        Self::build(test_config(), builder, Arc::new(GreedyAllocator))
    }

    pub fn with_silent_allocator() -> Self {
        Self::build(test_config(), StubBuilder::default(), Arc::new(SilentAllocator))
    }

    fn build(config: PluginConfig, builder: StubBuilder, allocator: Arc<dyn Allocator>) -> Self {
        let builder = Arc::new(builder);
        let events = MemoryEventRecorder::new();
        let store = MemoryStore::new();
        let handle =
            Handle::new(Arc::new(store.clone())).with_event_recorder(Arc::new(events.clone()));
        let plugin = VgpuSchedulerPlugin::new(config, handle, builder.clone(), allocator);
        Self {
            plugin,
            builder,
            events,
            store,
        }
    }

    pub fn into_plugin(self) -> VgpuSchedulerPlugin {
        self.plugin
    }
}

/// Defaults with a short retry backoff.
pub fn test_config() -> PluginConfig {
    let mut config = PluginConfig::default();
    config.retry.initial_backoff = Duration::from_millis(1);
    config.retry.max_backoff = Duration::from_millis(5);
    config
}
