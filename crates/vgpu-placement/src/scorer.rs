//! Host scoring for placement decisions.
//!
//! A host's score comes from the workload's placement policy:
//! - **Pack**: prefer hosts whose devices are already busy
//! - **Spread**: prefer hosts whose devices are idle
//! - no policy: a fixed neutral score
//!
//! A workload asking for linked topology then gets a bonus on hosts that
//! report GPU links and a penalty elsewhere. The result is clamped.

use tracing::debug;

use vgpu_core::{NodePolicy, TopologyMode};

use crate::device::DeviceView;

/// Lowest score a single plugin may return for a host.
pub const MIN_NODE_SCORE: i64 = 0;

/// Highest score a single plugin may return for a host.
pub const MAX_NODE_SCORE: i64 = 100;

/// Highest total score across all scoring plugins.
pub const MAX_TOTAL_SCORE: i64 = i64::MAX;

/// Score used when the workload declares no recognized policy.
pub const NEUTRAL_SCORE: i64 = 50;

/// Topology bonus/penalty as a percentage of the policy score.
pub const TOPOLOGY_ADJUSTMENT_PERCENT: i64 = 10;

/// Scored result for a single host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScore {
    pub host: String,
    pub score: i64,
}

/// Individual score components for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub policy: Option<NodePolicy>,
    /// Score from the placement policy alone.
    pub base: i64,
    /// Signed topology adjustment applied to `base` (0 when not requested).
    pub topology: i64,
    /// Final clamped score.
    pub score: i64,
}

/// Higher when the host's devices are more occupied.
pub fn pack_score(view: &DeviceView, max_score: f64) -> f64 {
    view.utilization() * max_score
}

/// Higher when the host's devices are less occupied.
pub fn spread_score(view: &DeviceView, max_score: f64) -> f64 {
    (1.0 - view.utilization()) * max_score
}

/// Score from the placement policy, before any topology adjustment.
pub fn policy_score(view: &DeviceView, policy: Option<NodePolicy>) -> i64 {
    let max = MAX_NODE_SCORE as f64;
    match policy {
        Some(NodePolicy::Pack) => pack_score(view, max) as i64,
        Some(NodePolicy::Spread) => spread_score(view, max) as i64,
        None => NEUTRAL_SCORE,
    }
}

/// `ceil(score * 10 / 100)` for non-negative scores.
pub fn topology_adjustment(score: i64) -> i64 {
    (score * TOPOLOGY_ADJUSTMENT_PERCENT + 99) / 100
}

/// Clamp into `[MIN_NODE_SCORE, min(MAX_NODE_SCORE, MAX_TOTAL_SCORE)]`.
///
/// The per-host ceiling applies as well as the aggregate one, so a
/// topology bonus on top of a full score comes back as `MAX_NODE_SCORE`.
/// A scheduler capping only at `MAX_TOTAL_SCORE` would keep it at 110.
pub fn clamp_score(score: i64) -> i64 {
    let ceiling = MAX_NODE_SCORE.min(MAX_TOTAL_SCORE);
    if score > ceiling {
        debug!(score, max = ceiling, "clamping score to max");
        ceiling
    } else if score < MIN_NODE_SCORE {
        debug!(score, min = MIN_NODE_SCORE, "clamping score to min");
        MIN_NODE_SCORE
    } else {
        score
    }
}

/// Full scoring of one host view.
pub fn score_view(
    view: &DeviceView,
    policy: Option<NodePolicy>,
    topology: Option<TopologyMode>,
) -> ScoreBreakdown {
    let base = policy_score(view, policy);

    let topology = match topology {
        Some(TopologyMode::Link) => {
            let adjustment = topology_adjustment(base);
            if view.has_gpu_topology() {
                debug!(host = view.name(), adjustment, "adding topology bonus");
                adjustment
            } else {
                debug!(host = view.name(), adjustment, "applying topology penalty");
                -adjustment
            }
        }
        None => 0,
    };

    ScoreBreakdown {
        policy,
        base,
        topology,
        score: clamp_score(base + topology),
    }
}

/// Sort best first. Equal scores keep their input order.
pub fn rank_hosts(mut scores: Vec<HostScore>) -> Vec<HostScore> {
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}
