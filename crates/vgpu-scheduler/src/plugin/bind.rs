use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use vgpu_core::{
    ASSIGNED_PHASE_LABEL, AssignPhase, PRE_ALLOCATED_ANNOTATION, PREDICATE_NODE_ANNOTATION,
    PREDICATE_TIME_ANNOTATION, PREDICATE_TIME_SENTINEL,
};
use vgpu_state::{Binding, MetadataPatch, StoreError, Workload, WorkloadKey};

use crate::error::{SchedulerError, SchedulerResult};
use crate::framework::{BindPlugin, CycleState, Status};
use crate::retry::retry_on_error;

use super::VgpuSchedulerPlugin;
use super::state;

/// Unix time in nanoseconds, truncated to microsecond resolution.
fn predicate_time() -> u64 {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;
    micros.saturating_mul(1_000)
}

/// Marks a workload whose bind failed.
fn allocation_failed_patch() -> MetadataPatch {
    MetadataPatch::default()
        .label(ASSIGNED_PHASE_LABEL, AssignPhase::Failed.as_str())
        .annotation(PREDICATE_TIME_ANNOTATION, &PREDICATE_TIME_SENTINEL.to_string())
}

impl VgpuSchedulerPlugin {
    /// Metadata recording the placement decision.
    fn bind_patch(
        &self,
        state: &CycleState,
        workload: &Workload,
        host: &str,
    ) -> SchedulerResult<MetadataPatch> {
        let patch = MetadataPatch::default()
            .label(ASSIGNED_PHASE_LABEL, AssignPhase::Succeeded.as_str());

        if !self.is_vgpu_workload(state, workload)? {
            let sentinel = PREDICATE_TIME_SENTINEL.to_string();
            return Ok(patch.annotation(PREDICATE_TIME_ANNOTATION, &sentinel));
        }

        let allocation = state::read_pre_allocation(state, host)?
            .ok_or_else(|| SchedulerError::MissingPreAllocation(host.to_string()))?;
        Ok(patch
            .annotation(PREDICATE_NODE_ANNOTATION, host)
            .annotation(PRE_ALLOCATED_ANNOTATION, allocation.as_str())
            .annotation(PREDICATE_TIME_ANNOTATION, &predicate_time().to_string()))
    }

    async fn commit(
        &self,
        cancel: &CancellationToken,
        state: &CycleState,
        workload: &Workload,
        host: &str,
    ) -> Status {
        let key = workload.key();

        let patch = match self.bind_patch(state, workload, host) {
            Ok(patch) => patch,
            Err(err) => {
                error!(workload = %key, host, %err, "building bind patch failed");
                return err.into();
            }
        };

        let store = self.handle.store();
        let (key_ref, patch_ref) = (&key, &patch);
        let patched = retry_on_error(&self.config.retry, cancel, StoreError::is_retriable, move || {
            store.patch_metadata(key_ref, patch_ref)
        })
        .await;
        if let Err(err) = patched {
            error!(workload = %key, host, %err, "patching workload metadata failed");
            return SchedulerError::from(err).into();
        }
        debug!(workload = %key, host, "patched workload metadata");

        let binding = Binding {
            workload: key.clone(),
            uid: workload.uid.clone(),
            host: host.to_string(),
        };
        let bound = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = store.bind(&binding) => result,
        };
        if let Err(err) = bound {
            error!(workload = %key, host, %err, "binding workload to host failed");
            self.mark_allocation_failed(&key).await;
            return SchedulerError::from(err).into();
        }

        info!(workload = %key, host, "successfully bound workload to host");
        Status::success()
    }

    /// Single attempt; failures are only logged.
    async fn mark_allocation_failed(&self, key: &WorkloadKey) {
        if let Err(err) = self
            .handle
            .store()
            .patch_metadata(key, &allocation_failed_patch())
            .await
        {
            error!(workload = %key, %err, "marking workload allocation failed");
        }
    }
}

#[async_trait]
impl BindPlugin for VgpuSchedulerPlugin {
    async fn bind(
        &self,
        cancel: &CancellationToken,
        state: &CycleState,
        workload: &Workload,
        host: &str,
    ) -> Status {
        self.commit_gate
            .run(move || self.commit(cancel, state, workload, host))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use vgpu_state::MemoryStore;

    use super::*;
    use crate::framework::{Code, FilterPlugin};
    use crate::plugin::state::{PreAllocation, write_pre_allocation};
    use crate::plugin::testing::*;

    fn seeded(harness: &Harness, workload: &Workload) -> MemoryStore {
        harness.store.put(workload.clone());
        harness.store.clone()
    }

    #[tokio::test]
    async fn device_less_bind_writes_sentinel() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert!(status.is_success(), "{status}");
        let stored = store.get(&workload.key()).unwrap();
        assert_eq!(stored.label(ASSIGNED_PHASE_LABEL), Some("succeeded"));
        assert_eq!(
            stored.annotation(PREDICATE_TIME_ANNOTATION),
            Some("18446744073709551615")
        );
        assert_eq!(stored.annotation(PREDICATE_NODE_ANNOTATION), None);
        assert_eq!(stored.annotation(PRE_ALLOCATED_ANNOTATION), None);
        assert_eq!(stored.node_name.as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn vgpu_bind_carries_pre_allocation() {
        let harness = Harness::new();
        let workload = vgpu_workload("train", 1, 10);
        let store = seeded(&harness, &workload);
        let state = CycleState::new();
        write_pre_allocation(&state, "n1", PreAllocation::new("default[0_GPU-0000_0_2048]"));

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &state, &workload, "n1")
            .await;

        assert!(status.is_success(), "{status}");
        let stored = store.get(&workload.key()).unwrap();
        assert_eq!(stored.label(ASSIGNED_PHASE_LABEL), Some("succeeded"));
        assert_eq!(stored.annotation(PREDICATE_NODE_ANNOTATION), Some("n1"));
        assert_eq!(
            stored.annotation(PRE_ALLOCATED_ANNOTATION),
            Some("default[0_GPU-0000_0_2048]")
        );

        let stamp: u64 = stored
            .annotation(PREDICATE_TIME_ANNOTATION)
            .unwrap()
            .parse()
            .unwrap();
        assert_ne!(stamp, PREDICATE_TIME_SENTINEL);
        assert_eq!(stamp % 1_000, 0);
    }

    #[tokio::test]
    async fn missing_pre_allocation_is_an_error() {
        let harness = Harness::new();
        let workload = vgpu_workload("train", 1, 10);
        let store = seeded(&harness, &workload);

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert_eq!(status.code(), Code::Error);
        assert!(status.message().contains("pre-allocated"));
        assert_eq!(store.patch_calls(), 0);
        assert_eq!(store.bind_calls(), 0);
    }

    #[tokio::test]
    async fn transient_patch_errors_are_retried() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);
        store.fail_next_patches([
            StoreError::Conflict("resource version changed".into()),
            StoreError::TooManyRequests("slow down".into()),
        ]);

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert!(status.is_success(), "{status}");
        assert_eq!(store.patch_calls(), 3);
        assert_eq!(store.bindings().len(), 1);
    }

    #[tokio::test]
    async fn terminal_patch_error_skips_bind() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);
        store.fail_patches(StoreError::Forbidden("no patch rights".into()));

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert_eq!(status.code(), Code::Error);
        assert!(status.message().contains("no patch rights"));
        assert_eq!(store.patch_calls(), 1);
        assert_eq!(store.bind_calls(), 0);
    }

    #[tokio::test]
    async fn bind_failure_marks_workload_failed() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);
        store.fail_binds(StoreError::Invalid("host is cordoned".into()));

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert_eq!(status.code(), Code::Error);
        assert!(status.message().contains("host is cordoned"));
        let stored = store.get(&workload.key()).unwrap();
        assert_eq!(stored.label(ASSIGNED_PHASE_LABEL), Some("failed"));
        assert_eq!(
            stored.annotation(PREDICATE_TIME_ANNOTATION),
            Some("18446744073709551615")
        );
        assert!(stored.node_name.is_none());
        assert!(store.bindings().is_empty());
    }

    #[tokio::test]
    async fn failed_compensation_returns_bind_error() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);
        store.fail_patches_after(1, StoreError::Forbidden("no patch rights".into()));
        store.fail_binds(StoreError::Invalid("host is cordoned".into()));

        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &CycleState::new(), &workload, "n1")
            .await;

        assert_eq!(status.code(), Code::Error);
        assert!(status.message().contains("host is cordoned"), "{status}");
        assert_eq!(store.patch_calls(), 2);
        assert_eq!(store.patch_log().len(), 1);
        assert_eq!(store.bind_calls(), 1);
        let stored = store.get(&workload.key()).unwrap();
        assert_eq!(stored.label(ASSIGNED_PHASE_LABEL), Some("succeeded"));
        assert!(store.bindings().is_empty());
    }

    #[tokio::test]
    async fn cancelled_bind_still_holds_commit_interval() {
        let harness = Harness::new();
        let workload = cpu_workload("web");
        let store = seeded(&harness, &workload);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let start = Instant::now();
        let status = harness
            .plugin
            .bind(&cancel, &CycleState::new(), &workload, "n1")
            .await;

        assert_eq!(status.code(), Code::Error);
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(store.bind_calls(), 0);
    }

    #[tokio::test]
    async fn sequential_binds_are_spaced() {
        let harness = Harness::new();
        let first = cpu_workload("a");
        let second = cpu_workload("b");
        harness.store.put(first.clone());
        harness.store.put(second.clone());
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for workload in [&first, &second] {
            let status = harness
                .plugin
                .bind(&cancel, &CycleState::new(), workload, "n1")
                .await;
            assert!(status.is_success());
        }
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn filter_then_bind_uses_simulated_descriptor() {
        let harness = Harness::new();
        let workload = vgpu_workload("train", 1, 10);
        let store = seeded(&harness, &workload);
        let state = CycleState::new();

        let host = gpu_host("n1", 2);
        assert!(harness.plugin.filter(&state, &workload, &host).is_success());
        let status = harness
            .plugin
            .bind(&CancellationToken::new(), &state, &workload, "n1")
            .await;

        assert!(status.is_success(), "{status}");
        assert_eq!(
            store.get(&workload.key()).unwrap().annotation(PRE_ALLOCATED_ANNOTATION),
            Some("default[0_GPU-0000_10_1024]")
        );
    }
}
