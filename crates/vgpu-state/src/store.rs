//! Workload store contract and an in-memory implementation.
//!
//! The scheduler only ever patches workload metadata and binds workloads
//! to hosts; both go through [`WorkloadStore`]. [`MemoryStore`] keeps
//! workloads in a map and can be scripted to fail, which the scheduler
//! tests use in place of a real cluster API.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::*;

/// Writes the scheduler performs against the cluster store.
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// Merge labels and annotations into the workload's metadata.
    async fn patch_metadata(
        &self,
        workload: &WorkloadKey,
        patch: &MetadataPatch,
    ) -> StoreResult<()>;

    /// Bind the workload to a host.
    async fn bind(&self, binding: &Binding) -> StoreResult<()>;
}

/// Scripted failures: `passes` calls succeed untouched, then queued errors
/// are consumed, then `always` applies.
#[derive(Default)]
struct FailureScript {
    passes: usize,
    queued: VecDeque<StoreError>,
    always: Option<StoreError>,
}

impl FailureScript {
    fn next(&mut self) -> Option<StoreError> {
        if self.passes > 0 {
            self.passes -= 1;
            return None;
        }
        self.queued.pop_front().or_else(|| self.always.clone())
    }
}

#[derive(Default)]
struct Inner {
    workloads: HashMap<String, Workload>,
    bindings: Vec<Binding>,
    /// Merge patch bodies of applied patches, in order.
    patch_log: Vec<serde_json::Value>,
    patch_failures: FailureScript,
    bind_failures: FailureScript,
}

/// Thread-safe in-memory workload store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    latency: Option<Duration>,
    patch_calls: Arc<AtomicUsize>,
    bind_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (used to widen race windows in tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a workload.
    pub fn put(&self, workload: Workload) {
        let key = workload.key().table_key();
        self.lock().workloads.insert(key, workload);
    }

    pub fn get(&self, key: &WorkloadKey) -> Option<Workload> {
        self.lock().workloads.get(&key.table_key()).cloned()
    }

    /// All successful bindings, in commit order.
    pub fn bindings(&self) -> Vec<Binding> {
        self.lock().bindings.clone()
    }

    /// Merge patch bodies of every applied patch, in order.
    pub fn patch_log(&self) -> Vec<serde_json::Value> {
        self.lock().patch_log.clone()
    }

    /// Fail the next patches with these errors, in order.
    pub fn fail_next_patches(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.lock().patch_failures.queued.extend(errors);
    }

    /// Fail every patch (after any queued failures) with `error`.
    pub fn fail_patches(&self, error: StoreError) {
        self.lock().patch_failures.always = Some(error);
    }

    /// Let the next `passes` patches through, then fail every patch with `error`.
    pub fn fail_patches_after(&self, passes: usize, error: StoreError) {
        let mut inner = self.lock();
        inner.patch_failures.passes = passes;
        inner.patch_failures.always = Some(error);
    }

    /// Fail every bind with `error`.
    pub fn fail_binds(&self, error: StoreError) {
        self.lock().bind_failures.always = Some(error);
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }

    /// Highest number of store calls observed executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn apply_patch(&self, key: &WorkloadKey, patch: &MetadataPatch) -> StoreResult<()> {
        let mut inner = self.lock();
        if let Some(err) = inner.patch_failures.next() {
            return Err(err);
        }
        let workload = inner
            .workloads
            .get_mut(&key.table_key())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        patch.apply_to(workload);
        inner.patch_log.push(patch.to_merge_patch());
        debug!(workload = %key, "metadata patched");
        Ok(())
    }

    fn apply_binding(&self, binding: &Binding) -> StoreResult<()> {
        let mut inner = self.lock();
        if let Some(err) = inner.bind_failures.next() {
            return Err(err);
        }
        let workload = inner
            .workloads
            .get_mut(&binding.workload.table_key())
            .ok_or_else(|| StoreError::NotFound(binding.workload.to_string()))?;
        if let Some(existing) = &workload.node_name {
            return Err(StoreError::Conflict(format!(
                "{} is already bound to {existing}",
                binding.workload
            )));
        }
        workload.node_name = Some(binding.host.clone());
        inner.bindings.push(binding.clone());
        debug!(workload = %binding.workload, host = %binding.host, "workload bound");
        Ok(())
    }
}

#[async_trait]
impl WorkloadStore for MemoryStore {
    async fn patch_metadata(
        &self,
        workload: &WorkloadKey,
        patch: &MetadataPatch,
    ) -> StoreResult<()> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = self.apply_patch(workload, patch);
        self.leave();
        result
    }

    async fn bind(&self, binding: &Binding) -> StoreResult<()> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = self.apply_binding(binding);
        self.leave();
        result
    }
}
