//! Domain types for workloads and hosts.
//!
//! These mirror the subset of the cluster objects the scheduler reads.
//! Labels and annotations are the side channel used to record scheduling
//! decisions on a workload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource name → quantity. Device memory is in MiB, everything else in units.
pub type ResourceList = BTreeMap<String, i64>;

/// A single execution unit of a workload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub name: String,
    pub limits: ResourceList,
    pub requests: ResourceList,
}

impl Container {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a limit (builder style).
    pub fn with_limit(mut self, resource: &str, quantity: i64) -> Self {
        self.limits.insert(resource.to_string(), quantity);
        self
    }

    /// Quantity of `resource`, taken from limits first and requests second.
    pub fn resource(&self, resource: &str) -> i64 {
        self.limits
            .get(resource)
            .or_else(|| self.requests.get(resource))
            .copied()
            .unwrap_or(0)
    }
}

/// A schedulable unit (analogous to a pod).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workload {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub containers: Vec<Container>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Host the workload is bound to, if any.
    pub node_name: Option<String>,
}

impl Workload {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            uid: format!("{namespace}-{name}"),
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }

    pub fn key(&self) -> WorkloadKey {
        WorkloadKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Sum of `resource` across all containers.
    pub fn total_resource(&self, resource: &str) -> i64 {
        self.containers.iter().map(|c| c.resource(resource)).sum()
    }
}

/// Namespaced identity of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    /// Composite key used by the stores: `{namespace}/{name}`.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A placement target (analogous to a node).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Host {
    pub name: String,
    pub allocatable: ResourceList,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl Host {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_allocatable(mut self, resource: &str, quantity: i64) -> Self {
        self.allocatable.insert(resource.to_string(), quantity);
        self
    }

    pub fn allocatable(&self, resource: &str) -> i64 {
        self.allocatable.get(resource).copied().unwrap_or(0)
    }
}

/// A host together with the workloads currently bound to it.
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    pub host: Host,
    pub workloads: Vec<Workload>,
}

impl HostInfo {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            workloads: Vec::new(),
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workloads.push(workload);
        self
    }

    pub fn name(&self) -> &str {
        &self.host.name
    }
}

/// Label and annotation changes merged into a workload's metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataPatch {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl MetadataPatch {
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }

    /// Render as a JSON merge patch on `metadata`.
    pub fn to_merge_patch(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "labels": self.labels,
                "annotations": self.annotations,
            }
        })
    }

    /// Merge into a workload in place.
    pub fn apply_to(&self, workload: &mut Workload) {
        for (k, v) in &self.labels {
            workload.labels.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.annotations {
            workload.annotations.insert(k.clone(), v.clone());
        }
    }
}

/// Request to bind a workload to a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub workload: WorkloadKey,
    pub uid: String,
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_resource_prefers_limits() {
        let mut c = Container::new("main").with_limit("gpu", 2);
        c.requests.insert("gpu".to_string(), 1);
        c.requests.insert("cores".to_string(), 30);

        assert_eq!(c.resource("gpu"), 2);
        assert_eq!(c.resource("cores"), 30);
        assert_eq!(c.resource("memory"), 0);
    }

    #[test]
    fn total_resource_sums_containers() {
        let w = Workload::new("default", "train")
            .with_container(Container::new("a").with_limit("gpu", 1))
            .with_container(Container::new("b").with_limit("gpu", 3))
            .with_container(Container::new("c"));

        assert_eq!(w.total_resource("gpu"), 4);
        assert_eq!(w.total_resource("cpu"), 0);
    }

    #[test]
    fn workload_key_format() {
        let w = Workload::new("prod", "api");
        assert_eq!(w.key().table_key(), "prod/api");
        assert_eq!(w.key().to_string(), "prod/api");
    }

    #[test]
    fn patch_merges_without_dropping_existing() {
        let mut w = Workload::new("default", "p").with_annotation("keep", "me");
        w.labels.insert("phase".to_string(), "old".to_string());

        MetadataPatch::default()
            .label("phase", "new")
            .annotation("added", "1")
            .apply_to(&mut w);

        assert_eq!(w.label("phase"), Some("new"));
        assert_eq!(w.annotation("keep"), Some("me"));
        assert_eq!(w.annotation("added"), Some("1"));
    }

    #[test]
    fn merge_patch_json_shape() {
        let patch = MetadataPatch::default().label("l", "v").annotation("a", "b");
        let json = patch.to_merge_patch();
        assert_eq!(json["metadata"]["labels"]["l"], "v");
        assert_eq!(json["metadata"]["annotations"]["a"], "b");
    }

    #[test]
    fn host_allocatable_defaults_to_zero() {
        let host = Host::new("n1").with_allocatable("gpu", 2);
        assert_eq!(host.allocatable("gpu"), 2);
        assert_eq!(host.allocatable("other"), 0);
    }
}
