//! Shared work queue drained by a fixed pool of workers.
//!
//! Workers may push new items while processing a claimed one. The queue is
//! exhausted only when it is empty and no claim is outstanding, at which
//! point every waiting worker is released.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    in_flight: usize,
}

#[derive(Debug)]
pub(crate) struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    changed: Notify,
}

/// An item taken from the queue. Dropping it marks the item processed.
#[derive(Debug)]
pub(crate) struct Claim<'a, T> {
    queue: &'a WorkQueue<T>,
    pub item: T,
}

impl<T> Drop for Claim<'_, T> {
    fn drop(&mut self) {
        let mut state = self.queue.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        let idle = state.in_flight == 0 && state.items.is_empty();
        drop(state);
        if idle {
            self.queue.changed.notify_waiters();
        }
    }
}

impl<T> WorkQueue<T> {
    pub(crate) fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            state: Mutex::new(QueueState { items: items.into_iter().collect(), in_flight: 0 }),
            changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, item: T) {
        self.lock().items.push_back(item);
        self.changed.notify_waiters();
    }

    /// Wait for the next item. `None` once the queue is exhausted or `cancel` fires.
    pub(crate) async fn next(&self, cancel: &CancellationToken) -> Option<Claim<'_, T>> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            // Registered before the state check so a push in between is not missed.
            let changed = self.changed.notified();
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    state.in_flight += 1;
                    return Some(Claim { queue: self, item });
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            tokio::select! {
                _ = changed => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.lock().items.len()
    }
}
