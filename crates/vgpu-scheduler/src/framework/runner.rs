//! Single-workload scheduling cycle.
//!
//! ```text
//! pre_filter ──► filter (per host, parallel) ──► pre_score
//!                                                   │
//!            bind ◄── rank ◄── score (per host, parallel)
//! ```
//!
//! Filter and score fan out over at most [`PARALLELISM`] scoped threads
//! that pull host indices from a shared counter. Results are collected
//! back in input order. Ties in the ranking go to the host listed first.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vgpu_placement::{HostScore, MIN_NODE_SCORE, rank_hosts};
use vgpu_state::{HostInfo, Workload};

use super::cycle_state::CycleState;
use super::interface::SchedulerPlugin;
use super::status::{Code, Status};

/// Upper bound on threads evaluating hosts in one phase.
pub const PARALLELISM: usize = 16;

/// A host rejected during filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRejection {
    pub host: String,
    pub status: Status,
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub status: Status,
    /// Selected host. Set only when the status is success.
    pub host: Option<String>,
    /// Feasible hosts, best first.
    pub scores: Vec<HostScore>,
    pub rejections: Vec<HostRejection>,
}

impl ScheduleOutcome {
    fn failed(status: Status, rejections: Vec<HostRejection>) -> Self {
        Self {
            status,
            host: None,
            scores: Vec::new(),
            rejections,
        }
    }
}

/// Run every phase up to and including host selection. Does not bind.
pub fn select_host<P: SchedulerPlugin>(
    plugin: &P,
    state: &CycleState,
    workload: &Workload,
    hosts: &[HostInfo],
) -> ScheduleOutcome {
    let key = workload.key();

    let pre_filter = plugin.pre_filter(state, workload);
    let run_filter = match pre_filter.code() {
        Code::Success => true,
        Code::Skip => false,
        _ => {
            info!(workload = %key, status = %pre_filter, "pre-filter rejected workload");
            return ScheduleOutcome::failed(pre_filter, Vec::new());
        }
    };

    let (feasible, rejections) = if run_filter {
        match filter_hosts(plugin, state, workload, hosts) {
            Ok(split) => split,
            Err(outcome) => return outcome,
        }
    } else {
        (hosts.iter().collect(), Vec::new())
    };

    if feasible.is_empty() {
        let reasons: Vec<String> = rejections
            .iter()
            .map(|r| format!("{}: {}", r.host, r.status.message()))
            .collect();
        let status = Status::unschedulable(format!(
            "0/{} hosts are available: {}",
            hosts.len(),
            reasons.join("; ")
        ));
        info!(workload = %key, %status, "no feasible host");
        return ScheduleOutcome::failed(status, rejections);
    }

    let feasible_infos: Vec<HostInfo> = feasible.iter().map(|h| (*h).clone()).collect();
    let pre_score = plugin.pre_score(state, workload, &feasible_infos);
    let run_score = match pre_score.code() {
        Code::Success => true,
        Code::Skip => false,
        _ => return ScheduleOutcome::failed(pre_score, rejections),
    };

    let scores = if run_score {
        match score_hosts(plugin, state, workload, &feasible) {
            Ok(scores) => scores,
            Err(status) => return ScheduleOutcome::failed(status, rejections),
        }
    } else {
        feasible
            .iter()
            .map(|h| HostScore {
                host: h.name().to_string(),
                score: MIN_NODE_SCORE,
            })
            .collect()
    };

    let ranked = rank_hosts(scores);
    let host = ranked.first().map(|s| s.host.clone());
    debug!(workload = %key, ?ranked, "ranked feasible hosts");

    ScheduleOutcome {
        status: Status::success(),
        host,
        scores: ranked,
        rejections,
    }
}

/// Select a host and bind the workload to it.
pub async fn schedule_one<P: SchedulerPlugin>(
    plugin: &P,
    state: &CycleState,
    cancel: &CancellationToken,
    workload: &Workload,
    hosts: &[HostInfo],
) -> ScheduleOutcome {
    let mut outcome = run_blocking(|| select_host(plugin, state, workload, hosts));
    let Some(host) = outcome.host.clone() else {
        return outcome;
    };

    let status = plugin.bind(cancel, state, workload, &host).await;
    if !status.is_success() {
        warn!(workload = %workload.key(), %host, %status, "bind failed");
        outcome.host = None;
    }
    outcome.status = status;
    outcome
}

/// Run synchronous host evaluation without stalling other tasks on a
/// multi-threaded runtime.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Evaluate `work` for every item on a bounded pool of scoped threads.
///
/// The calling thread drains the queue too, so every item is evaluated
/// even when no worker could be spawned. A slot is `None` when `work`
/// panicked for that item.
fn parallelize<T, R, F>(items: &[T], work: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let next = AtomicUsize::new(0);
    let drain = || {
        let mut done = Vec::new();
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(index) else {
                break;
            };
            done.push((index, panic::catch_unwind(AssertUnwindSafe(|| work(item))).ok()));
        }
        done
    };

    let workers = PARALLELISM.min(items.len());
    let done = thread::scope(|s| {
        let handles: Vec<_> = (1..workers)
            .filter_map(|n| {
                thread::Builder::new()
                    .name(format!("host-eval-{n}"))
                    .spawn_scoped(s, &drain)
                    .map_err(|err| warn!(error = %err, "could not spawn host evaluation thread"))
                    .ok()
            })
            .collect();
        let mut done = drain();
        for handle in handles {
            if let Ok(part) = handle.join() {
                done.extend(part);
            }
        }
        done
    });

    let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
    for (index, result) in done {
        slots[index] = result;
    }
    slots
}

type FilterSplit<'a> = (Vec<&'a HostInfo>, Vec<HostRejection>);

fn filter_hosts<'a, P: SchedulerPlugin>(
    plugin: &P,
    state: &CycleState,
    workload: &Workload,
    hosts: &'a [HostInfo],
) -> Result<FilterSplit<'a>, ScheduleOutcome> {
    let statuses = parallelize(hosts, |host| plugin.filter(state, workload, host));

    let mut feasible = Vec::new();
    let mut rejections = Vec::new();
    for (host, status) in hosts.iter().zip(statuses) {
        let status = status.unwrap_or_else(|| {
            Status::error(format!("filter panicked on host {}", host.name()))
        });
        match status.code() {
            Code::Success | Code::Skip => feasible.push(host),
            Code::Error => {
                warn!(host = host.name(), %status, "filter failed");
                return Err(ScheduleOutcome::failed(status, rejections));
            }
            Code::Unschedulable | Code::UnschedulableAndUnresolvable => {
                debug!(host = host.name(), %status, "host filtered out");
                rejections.push(HostRejection {
                    host: host.name().to_string(),
                    status,
                });
            }
        }
    }
    Ok((feasible, rejections))
}

fn score_hosts<P: SchedulerPlugin>(
    plugin: &P,
    state: &CycleState,
    workload: &Workload,
    hosts: &[&HostInfo],
) -> Result<Vec<HostScore>, Status> {
    parallelize(hosts, |host| plugin.score(state, workload, host.name()))
        .into_iter()
        .zip(hosts)
        .map(|(score, host)| -> Result<HostScore, Status> {
            let score = score.unwrap_or_else(|| {
                Err(Status::error(format!("score panicked on host {}", host.name())))
            })?;
            Ok(HostScore {
                host: host.name().to_string(),
                score,
            })
        })
        .collect()
}
