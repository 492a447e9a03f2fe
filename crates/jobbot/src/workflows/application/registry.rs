use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::flow::ApplicationFlow;

/// Identifier handed to clients for an open flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub String);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static FLOW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_flow_id() -> FlowId {
    let id = FLOW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FlowId(format!("flow-{id:06}"))
}

/// Shared handle to one flow. The lock is held only while the flow itself changes, never across
/// a remote call.
pub type FlowHandle = Arc<tokio::sync::Mutex<ApplicationFlow>>;

struct Entry {
    handle: FlowHandle,
    touched: Instant,
    finished: bool,
}

/// In-memory set of open flows. Flows are session scoped and never persisted.
#[derive(Default)]
pub struct FlowRegistry {
    flows: Mutex<HashMap<FlowId, Entry>>,
}

impl FlowRegistry {
    pub fn insert(&self, flow: ApplicationFlow) -> (FlowId, FlowHandle) {
        let id = next_flow_id();
        let handle = Arc::new(tokio::sync::Mutex::new(flow));
        self.flows
            .lock()
            .expect("flow registry mutex poisoned")
            .insert(
                id.clone(),
                Entry {
                    handle: Arc::clone(&handle),
                    touched: Instant::now(),
                    finished: false,
                },
            );
        (id, handle)
    }

    /// Look up a flow and count the lookup as activity.
    pub fn get(&self, id: &FlowId) -> Option<FlowHandle> {
        let mut flows = self.flows.lock().expect("flow registry mutex poisoned");
        let entry = flows.get_mut(id)?;
        entry.touched = Instant::now();
        Some(Arc::clone(&entry.handle))
    }

    /// Refresh activity after an action and remember whether the flow has finished.
    pub fn touch(&self, id: &FlowId, finished: bool) {
        if let Some(entry) = self
            .flows
            .lock()
            .expect("flow registry mutex poisoned")
            .get_mut(id)
        {
            entry.touched = Instant::now();
            entry.finished = finished;
        }
    }

    pub fn remove(&self, id: &FlowId) -> Option<FlowHandle> {
        self.flows
            .lock()
            .expect("flow registry mutex poisoned")
            .remove(id)
            .map(|entry| entry.handle)
    }

    /// Remove flows untouched for longer than `idle`, or `finished` once they have finished.
    pub fn remove_stale(&self, idle: Duration, finished: Duration) -> Vec<(FlowId, FlowHandle)> {
        let now = Instant::now();
        let mut flows = self.flows.lock().expect("flow registry mutex poisoned");
        let stale: Vec<FlowId> = flows
            .iter()
            .filter(|(_, entry)| {
                let limit = if entry.finished { finished } else { idle };
                now.duration_since(entry.touched) >= limit
            })
            .map(|(id, _)| id.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|id| flows.remove(&id).map(|entry| (id, entry.handle)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flows.lock().expect("flow registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
