//! In-memory store of search tasks, keyed by [`TaskId`].
//!
//! Lets a client that lost its stream reattach and poll. Terminal tasks are
//! kept for the configured retention and then evicted, either lazily on
//! lookup or by the background sweeper.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::query::SearchQuery;
use super::task::{TaskHandle, TaskId};

#[derive(Debug)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, Arc<TaskHandle>>,
    retention: Duration,
    event_buffer: usize,
}

impl TaskRegistry {
    pub fn new(retention: Duration, event_buffer: usize) -> Self {
        Self { tasks: DashMap::new(), retention, event_buffer }
    }

    /// Register a new Running task.
    pub fn create(&self, query: SearchQuery) -> Arc<TaskHandle> {
        let handle = Arc::new(TaskHandle::new(TaskId::generate(), query, self.event_buffer));
        self.tasks.insert(handle.id().clone(), Arc::clone(&handle));
        handle
    }

    /// Look up a task. Expired tasks are evicted and reported as absent.
    pub fn get(&self, id: &str) -> Option<Arc<TaskHandle>> {
        let handle = self.tasks.get(id).map(|entry| Arc::clone(entry.value()))?;
        if handle.is_expired(self.retention, Instant::now()) {
            self.tasks.remove(id);
            return None;
        }
        Some(handle)
    }

    /// Request cancellation. `false` for unknown ids or tasks already terminal.
    pub async fn cancel(&self, id: &str) -> bool {
        match self.get(id) {
            Some(handle) => handle.cancel().await,
            None => false,
        }
    }

    /// Cancel if still running and drop the task immediately.
    pub async fn forget(&self, id: &str) -> bool {
        match self.tasks.remove(id) {
            Some((_, handle)) => {
                handle.cancel().await;
                true
            }
            None => false,
        }
    }

    /// Evict every task terminal for longer than the retention period.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.tasks.len();
        self.tasks.retain(|_, handle| !handle.is_expired(self.retention, now));
        before.saturating_sub(self.tasks.len())
    }

    /// Sweep on a fixed interval until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.sweep_expired();
                if evicted > 0 {
                    debug!(evicted, remaining = registry.len(), "Evicted expired search tasks");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
