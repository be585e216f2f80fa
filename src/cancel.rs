//! Process-wide slot for the one task that may run at a time.
//!
//! The shell hands out a [`TaskGuard`] per task and keeps only the ability to
//! cancel whatever is active. Starting a task cancels the previous one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
pub struct TaskSlot {
    active: Mutex<Option<(u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl TaskSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new task, cancelling any task still registered.
    pub fn begin(self: &Arc<Self>) -> TaskGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace((id, token.clone()));
        if let Some((old_id, old)) = previous {
            debug!(task = old_id, "cancelling superseded task");
            old.cancel();
        }
        TaskGuard {
            slot: Arc::clone(self),
            id,
            token,
        }
    }

    /// Cancels the active task. Returns `false` when nothing was running.
    pub fn cancel_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some((id, token)) => {
                debug!(task = id, "cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Holds a task's registration; dropping it frees the slot.
pub struct TaskGuard {
    slot: Arc<TaskSlot>,
    id: u64,
    token: CancellationToken,
}

impl TaskGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let mut active = self
            .slot
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|(id, _)| *id == self.id) {
            *active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy(slot: &TaskSlot) -> bool {
        slot.active.lock().unwrap().is_some()
    }

    #[test]
    fn test_cancel_without_task() {
        let slot = TaskSlot::new();
        assert!(!slot.cancel_active());
        assert!(!busy(&slot));
    }

    #[test]
    fn test_cancel_active_task() {
        let slot = TaskSlot::new();
        let guard = slot.begin();
        assert!(busy(&slot));
        assert!(slot.cancel_active());
        assert!(guard.token().is_cancelled());
        drop(guard);
        assert!(!busy(&slot));
    }

    #[test]
    fn test_new_task_supersedes_old() {
        let slot = TaskSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());

        // The stale guard must not clear the newer registration.
        drop(first);
        assert!(busy(&slot));
        drop(second);
        assert!(!busy(&slot));
    }
}
