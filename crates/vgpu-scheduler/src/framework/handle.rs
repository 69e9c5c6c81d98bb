//! Services the framework hands to a plugin at construction.

use std::sync::Arc;

use vgpu_state::{EventRecorder, TracingEventRecorder, WorkloadStore};

/// Cluster store client and event sink shared by all phases.
#[derive(Clone)]
pub struct Handle {
    store: Arc<dyn WorkloadStore>,
    events: Arc<dyn EventRecorder>,
}

impl Handle {
    /// Events default to log lines until a recorder is attached.
    pub fn new(store: Arc<dyn WorkloadStore>) -> Self {
        Self {
            store,
            events: Arc::new(TracingEventRecorder),
        }
    }

    pub fn with_event_recorder(mut self, events: Arc<dyn EventRecorder>) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &dyn WorkloadStore {
        self.store.as_ref()
    }

    pub fn events(&self) -> &dyn EventRecorder {
        self.events.as_ref()
    }
}
