//! Diagnostic events recorded against workloads.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::types::{Workload, WorkloadKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub workload: WorkloadKey,
    pub event_type: EventType,
    pub reason: String,
    pub action: String,
    pub message: String,
}

/// Sink for workload events. Recording never fails the caller.
pub trait EventRecorder: Send + Sync {
    fn record(
        &self,
        workload: &Workload,
        event_type: EventType,
        reason: &str,
        action: &str,
        message: &str,
    );
}

/// Emits events as log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventRecorder;

impl EventRecorder for TracingEventRecorder {
    fn record(
        &self,
        workload: &Workload,
        event_type: EventType,
        reason: &str,
        action: &str,
        message: &str,
    ) {
        let key = workload.key();
        match event_type {
            EventType::Normal => info!(workload = %key, reason, action, message, "event"),
            EventType::Warning => warn!(workload = %key, reason, action, message, "event"),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventRecorder for MemoryEventRecorder {
    fn record(
        &self,
        workload: &Workload,
        event_type: EventType,
        reason: &str,
        action: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Event {
                workload: workload.key(),
                event_type,
                reason: reason.to_string(),
                action: action.to_string(),
                message: message.to_string(),
            });
    }
}
